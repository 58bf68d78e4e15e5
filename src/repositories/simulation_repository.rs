//! Repository for simulations and daily usage counters

use crate::error::RepositoryError;
use crate::models::{Simulation, SimulationUsage};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

pub struct SimulationRepository {
    pool: PgPool,
}

impl SimulationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Simulations
    // =========================================================================

    /// Insert a new simulation
    pub async fn create(&self, simulation: &Simulation) -> Result<Simulation, RepositoryError> {
        let created = sqlx::query_as::<_, Simulation>(
            r#"
            INSERT INTO simulations (user_id, course_id, simulation_type, title, parameters, results)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, course_id, simulation_type, title, parameters, results, created_at
            "#,
        )
        .bind(simulation.user_id)
        .bind(simulation.course_id)
        .bind(&simulation.simulation_type)
        .bind(&simulation.title)
        .bind(&simulation.parameters)
        .bind(&simulation.results)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Find a simulation by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Simulation>, RepositoryError> {
        let simulation = sqlx::query_as::<_, Simulation>(
            r#"
            SELECT id, user_id, course_id, simulation_type, title, parameters, results, created_at
            FROM simulations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(simulation)
    }

    /// Simulations of one user, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Simulation>, RepositoryError> {
        let rows = sqlx::query_as::<_, Simulation>(
            r#"
            SELECT id, user_id, course_id, simulation_type, title, parameters, results, created_at
            FROM simulations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Users who have simulated a given course
    pub async fn user_ids_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT DISTINCT user_id
            FROM simulations
            WHERE course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Delete a simulation owned by the given user
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM simulations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Daily quotas
    // =========================================================================

    /// Atomically take one unit of today's quota
    ///
    /// Returns the new counter value, or `None` when the counter already
    /// reached `max_per_day`. Concurrent calls serialize on the unique
    /// (user_id, usage_date) row.
    pub async fn try_consume_quota(
        &self,
        user_id: Uuid,
        usage_date: NaiveDate,
        max_per_day: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            INSERT INTO simulation_usages (user_id, usage_date, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, usage_date) DO UPDATE
            SET count = simulation_usages.count + 1
            WHERE simulation_usages.count < $3
            RETURNING count
            "#,
        )
        .bind(user_id)
        .bind(usage_date)
        .bind(max_per_day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(count,)| count))
    }

    /// Count a simulation without any cap (premium accounts)
    pub async fn record_usage(
        &self,
        user_id: Uuid,
        usage_date: NaiveDate,
    ) -> Result<i32, RepositoryError> {
        let (count,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO simulation_usages (user_id, usage_date, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, usage_date) DO UPDATE
            SET count = simulation_usages.count + 1
            RETURNING count
            "#,
        )
        .bind(user_id)
        .bind(usage_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Today's usage row, if any
    pub async fn usage_for(
        &self,
        user_id: Uuid,
        usage_date: NaiveDate,
    ) -> Result<Option<SimulationUsage>, RepositoryError> {
        let usage = sqlx::query_as::<_, SimulationUsage>(
            r#"
            SELECT id, user_id, usage_date, count
            FROM simulation_usages
            WHERE user_id = $1 AND usage_date = $2
            "#,
        )
        .bind(user_id)
        .bind(usage_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    /// Drop usage counters older than the cutoff date
    pub async fn delete_usage_before(&self, cutoff: NaiveDate) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM simulation_usages WHERE usage_date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
