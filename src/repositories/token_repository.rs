use crate::models::{PasswordResetToken, RefreshToken, VerificationToken};
use chrono::NaiveDateTime;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for the three one-shot token tables
/// (password reset, email verification, refresh)
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Create a new TokenRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Password reset tokens
    // =========================================================================

    /// Insert a reset token, invalidating any outstanding ones first
    pub async fn create_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: NaiveDateTime,
    ) -> SqlxResult<PasswordResetToken> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, used, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Look up a reset token by its opaque value
    pub async fn find_reset_token(&self, token: &str) -> SqlxResult<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Consume a reset token so it cannot be replayed
    pub async fn mark_reset_token_used(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE id = $1 AND used = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Email verification tokens
    // =========================================================================

    /// Insert a verification token, invalidating any outstanding ones first
    pub async fn create_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: NaiveDateTime,
    ) -> SqlxResult<VerificationToken> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE verification_tokens
            SET used = TRUE
            WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, used, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Look up a verification token by its opaque value
    pub async fn find_verification_token(
        &self,
        token: &str,
    ) -> SqlxResult<Option<VerificationToken>> {
        sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM verification_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Consume a verification token so it cannot be replayed
    pub async fn mark_verification_token_used(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_tokens
            SET used = TRUE
            WHERE id = $1 AND used = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Refresh tokens
    // =========================================================================

    /// Insert a refresh token for a new session
    pub async fn create_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: NaiveDateTime,
    ) -> SqlxResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, revoked, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Look up a refresh token by its opaque value
    pub async fn find_refresh_token(&self, token: &str) -> SqlxResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token, expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Revoke one refresh token (logout, rotation)
    pub async fn revoke_refresh_token(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every refresh token of a user (password change, account delete)
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Delete expired and consumed tokens across the three tables
    ///
    /// Returns the total number of rows removed.
    pub async fn delete_stale(&self, now: NaiveDateTime) -> SqlxResult<u64> {
        let mut total = 0u64;

        let result = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        total += result.rows_affected();

        let result = sqlx::query(
            "DELETE FROM verification_tokens WHERE used = TRUE OR expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        total += result.rows_affected();

        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE revoked = TRUE OR expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        total += result.rows_affected();

        Ok(total)
    }
}
