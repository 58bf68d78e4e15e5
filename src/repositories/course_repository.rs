//! Repository for courses, runners and odds history

use crate::error::RepositoryError;
use crate::models::{
    Cheval, CommentaireDetail, CoteHistorique, Course, Jockey, Participation, ParticipationDetail,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Courses
    // =========================================================================

    /// Insert or refresh a course keyed by its upstream feed identifier
    pub async fn upsert_by_external_ref(
        &self,
        external_ref: &str,
        name: &str,
        hippodrome: &str,
        race_date: NaiveDateTime,
        distance_m: i32,
        discipline: &str,
        status: &str,
    ) -> Result<Course, RepositoryError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (external_ref, name, hippodrome, race_date, distance_m, discipline, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_ref) DO UPDATE
            SET name = EXCLUDED.name,
                hippodrome = EXCLUDED.hippodrome,
                race_date = EXCLUDED.race_date,
                distance_m = EXCLUDED.distance_m,
                discipline = EXCLUDED.discipline,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING id, external_ref, name, hippodrome, race_date, distance_m,
                      discipline, field_size, status, created_at, updated_at
            "#,
        )
        .bind(external_ref)
        .bind(name)
        .bind(hippodrome)
        .bind(race_date)
        .bind(distance_m)
        .bind(discipline)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    /// Find a course by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, RepositoryError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, external_ref, name, hippodrome, race_date, distance_m,
                   discipline, field_size, status, created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    /// Find a course by its upstream feed identifier
    pub async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Course>, RepositoryError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, external_ref, name, hippodrome, race_date, distance_m,
                   discipline, field_size, status, created_at, updated_at
            FROM courses
            WHERE external_ref = $1
            "#,
        )
        .bind(external_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    /// Scheduled courses with a race date inside [from, to), soonest first
    pub async fn upcoming(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Course>, RepositoryError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, external_ref, name, hippodrome, race_date, distance_m,
                   discipline, field_size, status, created_at, updated_at
            FROM courses
            WHERE status = 'scheduled' AND race_date >= $1 AND race_date < $2
            ORDER BY race_date ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    /// Courses that finished after the given instant
    pub async fn finished_since(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<Course>, RepositoryError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, external_ref, name, hippodrome, race_date, distance_m,
                   discipline, field_size, status, created_at, updated_at
            FROM courses
            WHERE status = 'finished' AND updated_at >= $1
            ORDER BY race_date DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    /// Move a course to a new lifecycle status
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Horses, jockeys and participations
    // =========================================================================

    /// Insert or refresh a horse keyed by its registered name
    pub async fn upsert_cheval(
        &self,
        name: &str,
        age: Option<i32>,
        sex: Option<&str>,
    ) -> Result<Cheval, RepositoryError> {
        let cheval = sqlx::query_as::<_, Cheval>(
            r#"
            INSERT INTO chevaux (name, age, sex)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET age = COALESCE(EXCLUDED.age, chevaux.age),
                sex = COALESCE(EXCLUDED.sex, chevaux.sex)
            RETURNING id, name, age, sex, rating, created_at
            "#,
        )
        .bind(name)
        .bind(age)
        .bind(sex)
        .fetch_one(&self.pool)
        .await?;

        Ok(cheval)
    }

    /// Insert or refresh a jockey keyed by name
    pub async fn upsert_jockey(&self, name: &str) -> Result<Jockey, RepositoryError> {
        let jockey = sqlx::query_as::<_, Jockey>(
            r#"
            INSERT INTO jockeys (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, win_rate, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(jockey)
    }

    /// Insert or refresh one runner of a course, keyed by saddle number
    ///
    /// Also recomputes the course's cached field size.
    pub async fn upsert_participation(
        &self,
        course_id: Uuid,
        cheval_id: Uuid,
        jockey_id: Option<Uuid>,
        numero: i32,
        weight_kg: Option<Decimal>,
    ) -> Result<Participation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let participation = sqlx::query_as::<_, Participation>(
            r#"
            INSERT INTO participations (course_id, cheval_id, jockey_id, numero, weight_kg)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (course_id, numero) DO UPDATE
            SET cheval_id = EXCLUDED.cheval_id,
                jockey_id = EXCLUDED.jockey_id,
                weight_kg = EXCLUDED.weight_kg
            RETURNING id, course_id, cheval_id, jockey_id, numero, weight_kg,
                      current_odds, final_position, created_at
            "#,
        )
        .bind(course_id)
        .bind(cheval_id)
        .bind(jockey_id)
        .bind(numero)
        .bind(weight_kg)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE courses
            SET field_size = (SELECT COUNT(*) FROM participations WHERE course_id = $1),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(participation)
    }

    /// Runners of a course joined with horse and jockey names
    pub async fn participations_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<ParticipationDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, ParticipationDetail>(
            r#"
            SELECT p.id, p.course_id, p.cheval_id, p.numero, c.name AS cheval_name,
                   j.name AS jockey_name, p.weight_kg, p.current_odds, p.final_position
            FROM participations p
            JOIN chevaux c ON c.id = p.cheval_id
            LEFT JOIN jockeys j ON j.id = p.jockey_id
            WHERE p.course_id = $1
            ORDER BY p.numero ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Find one runner by course and saddle number
    pub async fn find_participation(
        &self,
        course_id: Uuid,
        numero: i32,
    ) -> Result<Option<Participation>, RepositoryError> {
        let participation = sqlx::query_as::<_, Participation>(
            r#"
            SELECT id, course_id, cheval_id, jockey_id, numero, weight_kg,
                   current_odds, final_position, created_at
            FROM participations
            WHERE course_id = $1 AND numero = $2
            "#,
        )
        .bind(course_id)
        .bind(numero)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participation)
    }

    /// Whether a participation row exists
    pub async fn participation_exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM participations WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Record the finishing position of one runner
    pub async fn record_final_position(
        &self,
        course_id: Uuid,
        numero: i32,
        position: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE participations
            SET final_position = $3
            WHERE course_id = $1 AND numero = $2
            "#,
        )
        .bind(course_id)
        .bind(numero)
        .bind(position)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Odds
    // =========================================================================

    /// Write a new current odds value and append it to the history
    pub async fn record_odds(
        &self,
        participation_id: Uuid,
        cote: Decimal,
    ) -> Result<CoteHistorique, RepositoryError> {
        if cote <= Decimal::ZERO {
            return Err(RepositoryError::InvalidInput(
                "Odds must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE participations
            SET current_odds = $2
            WHERE id = $1
            "#,
        )
        .bind(participation_id)
        .bind(cote)
        .execute(&mut *tx)
        .await?;

        let snapshot = sqlx::query_as::<_, CoteHistorique>(
            r#"
            INSERT INTO cotes_historique (participation_id, cote)
            VALUES ($1, $2)
            RETURNING id, participation_id, cote, recorded_at
            "#,
        )
        .bind(participation_id)
        .bind(cote)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(snapshot)
    }

    /// Odds history for one runner, oldest first
    pub async fn cotes_for_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Vec<CoteHistorique>, RepositoryError> {
        let rows = sqlx::query_as::<_, CoteHistorique>(
            r#"
            SELECT id, participation_id, cote, recorded_at
            FROM cotes_historique
            WHERE participation_id = $1
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(participation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Insert a user comment on a course
    pub async fn insert_commentaire(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentaireDetail, RepositoryError> {
        let comment = sqlx::query_as::<_, CommentaireDetail>(
            r#"
            WITH inserted AS (
                INSERT INTO commentaires_course (course_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, course_id, user_id, content, created_at
            )
            SELECT i.id, i.course_id, u.display_name AS author_name, i.content, i.created_at
            FROM inserted i
            LEFT JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Comments on a course, newest first
    pub async fn commentaires_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<CommentaireDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentaireDetail>(
            r#"
            SELECT cc.id, cc.course_id, u.display_name AS author_name, cc.content, cc.created_at
            FROM commentaires_course cc
            LEFT JOIN users u ON u.id = cc.user_id
            WHERE cc.course_id = $1
            ORDER BY cc.created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
