use crate::models::User;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    ///
    /// `password_hash` is `None` for federated accounts.
    pub async fn create(
        &self,
        email: &str,
        password_hash: Option<&str>,
        display_name: &str,
    ) -> SqlxResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, display_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, display_name, subscription_level,
                      email_verified, is_active, created_at, updated_at, last_login_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a user by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, display_name, subscription_level,
                   email_verified, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a user by email address
    pub async fn find_by_email(&self, email: &str) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, display_name, subscription_level,
                   email_verified, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update the mutable profile fields
    pub async fn update_profile(&self, id: Uuid, display_name: &str) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, display_name, subscription_level,
                      email_verified, is_active, created_at, updated_at, last_login_at
            "#,
        )
        .bind(id)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Replace the stored password hash
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark the account's email address as verified
    pub async fn set_email_verified(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the cached subscription level shown on the profile
    pub async fn set_subscription_level(&self, id: Uuid, level: &str) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_level = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(level)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Downgrade a batch of users to the free level (subscription expiry)
    pub async fn downgrade_to_free(&self, ids: &[Uuid]) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_level = 'free', updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Record a successful login
    pub async fn record_login(&self, id: Uuid) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-delete an account; the row stays for referential integrity
    pub async fn deactivate(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
