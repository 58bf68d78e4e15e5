use crate::models::{Prediction, PredictionEvaluation};
use rust_decimal::Decimal;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for stored predictions and their accuracy records
pub struct PredictionRepository {
    pool: PgPool,
}

impl PredictionRepository {
    /// Create a new PredictionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a prediction produced by the model service
    pub async fn create(
        &self,
        course_id: Uuid,
        model_version: &str,
        ranking: &serde_json::Value,
        confidence: Option<Decimal>,
    ) -> SqlxResult<Prediction> {
        sqlx::query_as::<_, Prediction>(
            r#"
            INSERT INTO predictions (course_id, model_version, ranking, confidence)
            VALUES ($1, $2, $3, $4)
            RETURNING id, course_id, model_version, ranking, confidence, created_at
            "#,
        )
        .bind(course_id)
        .bind(model_version)
        .bind(ranking)
        .bind(confidence)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a prediction by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Prediction>> {
        sqlx::query_as::<_, Prediction>(
            r#"
            SELECT id, course_id, model_version, ranking, confidence, created_at
            FROM predictions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Most recent prediction for a course
    pub async fn latest_for_course(&self, course_id: Uuid) -> SqlxResult<Option<Prediction>> {
        sqlx::query_as::<_, Prediction>(
            r#"
            SELECT id, course_id, model_version, ranking, confidence, created_at
            FROM predictions
            WHERE course_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a post-race accuracy record
    pub async fn create_evaluation(
        &self,
        prediction_id: Uuid,
        actual_order: &serde_json::Value,
        winner_hit: bool,
        podium_hits: i32,
        rank_correlation: Option<Decimal>,
    ) -> SqlxResult<PredictionEvaluation> {
        sqlx::query_as::<_, PredictionEvaluation>(
            r#"
            INSERT INTO prediction_evaluations
                (prediction_id, actual_order, winner_hit, podium_hits, rank_correlation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, prediction_id, actual_order, winner_hit, podium_hits,
                      rank_correlation, evaluated_at
            "#,
        )
        .bind(prediction_id)
        .bind(actual_order)
        .bind(winner_hit)
        .bind(podium_hits)
        .bind(rank_correlation)
        .fetch_one(&self.pool)
        .await
    }

    /// Accuracy record for a prediction, if it has been evaluated
    pub async fn evaluation_for(
        &self,
        prediction_id: Uuid,
    ) -> SqlxResult<Option<PredictionEvaluation>> {
        sqlx::query_as::<_, PredictionEvaluation>(
            r#"
            SELECT id, prediction_id, actual_order, winner_hit, podium_hits,
                   rank_correlation, evaluated_at
            FROM prediction_evaluations
            WHERE prediction_id = $1
            ORDER BY evaluated_at DESC
            LIMIT 1
            "#,
        )
        .bind(prediction_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Winner hit rate over all evaluations since the given instant
    ///
    /// Returns (evaluated, winner_hits).
    pub async fn accuracy_since(
        &self,
        since: chrono::NaiveDateTime,
    ) -> SqlxResult<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE winner_hit)
            FROM prediction_evaluations
            WHERE evaluated_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
