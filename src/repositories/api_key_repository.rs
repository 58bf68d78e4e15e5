use crate::models::ApiKey;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for API key storage and lookup
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    /// Create a new ApiKeyRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new key; only the hash of the secret is stored
    pub async fn create(
        &self,
        user_id: Uuid,
        label: &str,
        key_hash: &str,
        prefix: &str,
        expires_at: Option<NaiveDateTime>,
    ) -> SqlxResult<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, label, key_hash, prefix, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, label, key_hash, prefix, active, expires_at,
                      last_used_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(label)
        .bind(key_hash)
        .bind(prefix)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Number of active keys a user currently holds
    pub async fn count_active_for_user(&self, user_id: Uuid) -> SqlxResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM api_keys
            WHERE user_id = $1 AND active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// All keys of one user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> SqlxResult<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, label, key_hash, prefix, active, expires_at,
                   last_used_at, created_at
            FROM api_keys
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Look up a key by the hash of the presented secret
    pub async fn find_by_hash(&self, key_hash: &str) -> SqlxResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, label, key_hash, prefix, active, expires_at,
                   last_used_at, created_at
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Deactivate a key owned by the given user
    pub async fn deactivate(&self, id: Uuid, user_id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET active = FALSE
            WHERE id = $1 AND user_id = $2 AND active = TRUE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that a key was just used
    pub async fn touch_last_used(&self, id: Uuid) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET last_used_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
