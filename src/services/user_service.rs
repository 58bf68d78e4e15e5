use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::UserProfile;
use crate::repositories::{TokenRepository, UserRepository};
use std::sync::Arc;
use tracing::info;

/// Profile and credential management for authenticated users
pub struct UserService {
    user_repo: Arc<UserRepository>,
    token_repo: Arc<TokenRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<UserRepository>, token_repo: Arc<TokenRepository>) -> Self {
        Self {
            user_repo,
            token_repo,
        }
    }

    pub async fn profile(&self, user_id: uuid::Uuid) -> AppResult<UserProfile> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.profile())
    }

    pub async fn update_profile(
        &self,
        user_id: uuid::Uuid,
        display_name: &str,
    ) -> AppResult<UserProfile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation(
                "Display name must not be empty".to_string(),
            ));
        }
        if display_name.len() > 100 {
            return Err(AppError::Validation(
                "Display name must be at most 100 characters".to_string(),
            ));
        }

        let user = self
            .user_repo
            .update_profile(user_id, display_name)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(user_id = %user_id, "profile updated");
        Ok(user.profile())
    }

    /// Change the password, verifying the current one first
    ///
    /// All refresh tokens are revoked so other sessions must log in again.
    pub async fn change_password(
        &self,
        user_id: uuid::Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let stored_hash = user.password_hash.as_deref().ok_or_else(|| {
            AppError::Validation(
                "This account has no password; sign in through your identity provider".to_string(),
            )
        })?;

        if !auth::verify_password(current_password, stored_hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        auth::validate_password_strength(new_password)?;
        let new_hash = auth::hash_password(new_password)?;

        self.user_repo
            .update_password(user_id, &new_hash)
            .await
            .map_err(AppError::from)?;

        self.token_repo
            .revoke_all_for_user(user_id)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Soft-delete the account
    ///
    /// The row is kept so comments and payment history stay attributable,
    /// but the account can no longer log in.
    pub async fn deactivate(&self, user_id: uuid::Uuid) -> AppResult<()> {
        let deactivated = self
            .user_repo
            .deactivate(user_id)
            .await
            .map_err(AppError::from)?;
        if !deactivated {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.token_repo
            .revoke_all_for_user(user_id)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user_id, "account deactivated");
        Ok(())
    }
}
