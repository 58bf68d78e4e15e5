use crate::auth;
use crate::clients::IdentityClient;
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{User, UserProfile};
use crate::notifier::EmailClient;
use crate::repositories::{TokenRepository, UserRepository};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Token pair returned by register, login, refresh and federated login
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Account lifecycle and session management
pub struct AuthService {
    user_repo: Arc<UserRepository>,
    token_repo: Arc<TokenRepository>,
    email_client: Arc<EmailClient>,
    identity_client: Arc<IdentityClient>,
    auth_config: AuthConfig,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        token_repo: Arc<TokenRepository>,
        email_client: Arc<EmailClient>,
        identity_client: Arc<IdentityClient>,
        auth_config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            email_client,
            identity_client,
            auth_config,
        }
    }

    /// Create an account and open a session
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<AuthTokens> {
        let email = normalize_email(email);
        validate_email(&email)?;
        auth::validate_password_strength(password)?;

        let display_name = resolve_display_name(display_name, &email)?;
        let password_hash = auth::hash_password(password)?;

        let user = self
            .user_repo
            .create(&email, Some(&password_hash), &display_name)
            .await
            .map_err(|e| match RepositoryError::from(e) {
                RepositoryError::Duplicate(_) => {
                    AppError::Validation("An account with this email already exists".to_string())
                }
                other => AppError::from(other),
            })?;

        info!(user_id = %user.id, "registered new account");

        self.send_verification_email(&user).await;

        self.issue_tokens(&user).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let email = normalize_email(email);

        let user = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        // Federated accounts have no password; they log in via their provider
        let stored_hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !auth::verify_password(password, stored_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        self.user_repo
            .record_login(user.id)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user.id, "user logged in");

        self.issue_tokens(&user).await
    }

    /// Authenticate with a federated identity provider token
    ///
    /// The account is created on first login; the provider has already
    /// verified the email address.
    pub async fn federated_login(
        &self,
        provider: &str,
        provider_token: &str,
    ) -> AppResult<AuthTokens> {
        let identity = self.identity_client.userinfo(provider_token).await?;
        let email = normalize_email(&identity.email);
        validate_email(&email)?;

        info!(provider = %provider, "federated identity accepted");

        let existing = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(AppError::from)?;

        let user = match existing {
            Some(user) if !user.is_active => {
                return Err(AppError::Forbidden("Account is deactivated".to_string()));
            }
            Some(user) => user,
            None => {
                let display_name = resolve_display_name(identity.name.as_deref(), &email)?;
                let user = self
                    .user_repo
                    .create(&email, None, &display_name)
                    .await
                    .map_err(AppError::from)?;
                info!(user_id = %user.id, "created account from federated login");
                user
            }
        };

        if !user.email_verified {
            self.user_repo
                .set_email_verified(user.id)
                .await
                .map_err(AppError::from)?;
        }

        self.user_repo
            .record_login(user.id)
            .await
            .map_err(AppError::from)?;

        self.issue_tokens(&user).await
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// The presented token is revoked and replaced, so each refresh token
    /// can be used once.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let now = Utc::now().naive_utc();

        let stored = self
            .token_repo
            .find_refresh_token(refresh_token)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        if !stored.is_usable(now) {
            return Err(AppError::Unauthorized(
                "Refresh token is revoked or expired".to_string(),
            ));
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await
            .map_err(AppError::from)?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Forbidden("Account is deactivated".to_string()))?;

        self.token_repo
            .revoke_refresh_token(stored.id)
            .await
            .map_err(AppError::from)?;

        self.issue_tokens(&user).await
    }

    /// End a session by revoking its refresh token
    ///
    /// Unknown tokens are ignored so logout is idempotent.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        if let Some(stored) = self
            .token_repo
            .find_refresh_token(refresh_token)
            .await
            .map_err(AppError::from)?
        {
            self.token_repo
                .revoke_refresh_token(stored.id)
                .await
                .map_err(AppError::from)?;
            info!(user_id = %stored.user_id, "user logged out");
        }
        Ok(())
    }

    /// Start a password reset
    ///
    /// Always succeeds so the endpoint does not reveal whether an account
    /// exists for the address.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);

        let user = match self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(AppError::from)?
        {
            Some(user) if user.is_active => user,
            _ => {
                info!("password reset requested for unknown or inactive account");
                return Ok(());
            }
        };

        let token = auth::generate_opaque_token();
        let expires_at =
            Utc::now().naive_utc() + Duration::minutes(self.auth_config.reset_token_ttl_minutes);

        self.token_repo
            .create_reset_token(user.id, &token, expires_at)
            .await
            .map_err(AppError::from)?;

        if let Err(e) = self.email_client.send_password_reset(&user.email, &token).await {
            warn!(user_id = %user.id, error = %e, "failed to send password reset email");
        }

        Ok(())
    }

    /// Complete a password reset with the emailed token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        auth::validate_password_strength(new_password)?;

        let now = Utc::now().naive_utc();
        let stored = self
            .token_repo
            .find_reset_token(token)
            .await
            .map_err(AppError::from)?
            .filter(|t| t.is_usable(now))
            .ok_or_else(|| {
                AppError::Validation("Reset token is invalid or has expired".to_string())
            })?;

        let password_hash = auth::hash_password(new_password)?;
        let updated = self
            .user_repo
            .update_password(stored.user_id, &password_hash)
            .await
            .map_err(AppError::from)?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.token_repo
            .mark_reset_token_used(stored.id)
            .await
            .map_err(AppError::from)?;

        // Existing sessions no longer match the new credentials
        self.token_repo
            .revoke_all_for_user(stored.user_id)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %stored.user_id, "password reset completed");
        Ok(())
    }

    /// Confirm an email address with the emailed token
    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        let stored = self
            .token_repo
            .find_verification_token(token)
            .await
            .map_err(AppError::from)?
            .filter(|t| t.is_usable(now))
            .ok_or_else(|| {
                AppError::Validation("Verification token is invalid or has expired".to_string())
            })?;

        self.user_repo
            .set_email_verified(stored.user_id)
            .await
            .map_err(AppError::from)?;

        self.token_repo
            .mark_verification_token_used(stored.id)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %stored.user_id, "email verified");
        Ok(())
    }

    /// Send a fresh verification email to an authenticated user
    pub async fn resend_verification(&self, user_id: uuid::Uuid) -> AppResult<()> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.email_verified {
            return Err(AppError::BusinessLogic(
                "Email is already verified".to_string(),
            ));
        }

        self.send_verification_email(&user).await;
        Ok(())
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let (access_token, expires_in) = auth::issue_access_token(&self.auth_config, user)?;

        let refresh_token = auth::generate_opaque_token();
        let expires_at =
            Utc::now().naive_utc() + Duration::days(self.auth_config.refresh_token_ttl_days);
        self.token_repo
            .create_refresh_token(user.id, &refresh_token, expires_at)
            .await
            .map_err(AppError::from)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: user.profile(),
        })
    }

    /// Create a verification token and mail it, logging failures instead of
    /// failing the surrounding operation
    async fn send_verification_email(&self, user: &User) {
        let token = auth::generate_opaque_token();
        let expires_at = Utc::now().naive_utc()
            + Duration::hours(self.auth_config.verification_token_ttl_hours);

        match self
            .token_repo
            .create_verification_token(user.id, &token, expires_at)
            .await
        {
            Ok(_) => {
                if let Err(e) = self.email_client.send_verification(&user.email, &token).await {
                    warn!(user_id = %user.id, error = %e, "failed to send verification email");
                }
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "failed to store verification token");
            }
        }
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_email(email: &str) -> AppResult<()> {
    let well_formed = email.len() <= 254
        && email
            .split_once('@')
            .map(|(local, domain)| {
                !local.is_empty() && !domain.is_empty() && domain.contains('.')
            })
            .unwrap_or(false);

    if !well_formed {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    Ok(())
}

/// Fall back to the mailbox name when no display name was given
fn resolve_display_name(display_name: Option<&str>, email: &str) -> AppResult<String> {
    let name = match display_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => email.split('@').next().unwrap_or("joueur").to_string(),
    };

    if name.len() > 100 {
        return Err(AppError::Validation(
            "Display name must be at most 100 characters".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice@localhost").is_err());
    }

    #[test]
    fn test_resolve_display_name() {
        assert_eq!(
            resolve_display_name(Some("  Alice  "), "alice@example.com").unwrap(),
            "Alice"
        );
        assert_eq!(
            resolve_display_name(None, "alice@example.com").unwrap(),
            "alice"
        );
        assert_eq!(
            resolve_display_name(Some("   "), "bob@example.com").unwrap(),
            "bob"
        );
        assert!(resolve_display_name(Some(&"x".repeat(101)), "a@b.fr").is_err());
    }
}
