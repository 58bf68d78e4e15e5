use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::ApiKey;
use crate::repositories::ApiKeyRepository;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A freshly created key; the only response that ever carries the secret
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    #[serde(flatten)]
    pub key: ApiKey,
    pub secret: String,
}

/// Programmatic access keys for the REST API
pub struct ApiKeyService {
    api_key_repo: Arc<ApiKeyRepository>,
    max_per_user: i64,
}

impl ApiKeyService {
    pub fn new(api_key_repo: Arc<ApiKeyRepository>, max_per_user: i64) -> Self {
        Self {
            api_key_repo,
            max_per_user,
        }
    }

    /// Create a key, enforcing the per-user cap on active keys
    pub async fn create(
        &self,
        user_id: Uuid,
        label: &str,
        expires_in_days: Option<i64>,
    ) -> AppResult<CreatedApiKey> {
        let label = label.trim();
        if label.is_empty() || label.len() > 100 {
            return Err(AppError::Validation(
                "Label must be between 1 and 100 characters".to_string(),
            ));
        }

        let expires_at = match expires_in_days {
            Some(days) if (1..=3650).contains(&days) => {
                Some(Utc::now().naive_utc() + Duration::days(days))
            }
            Some(_) => {
                return Err(AppError::Validation(
                    "Expiry must be between 1 and 3650 days".to_string(),
                ));
            }
            None => None,
        };

        let active = self
            .api_key_repo
            .count_active_for_user(user_id)
            .await
            .map_err(AppError::from)?;
        if active >= self.max_per_user {
            return Err(AppError::Forbidden(format!(
                "Maximum of {} active API keys reached",
                self.max_per_user
            )));
        }

        let (secret, prefix, hash) = auth::generate_api_key();
        let key = self
            .api_key_repo
            .create(user_id, label, &hash, &prefix, expires_at)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user_id, key_id = %key.id, "api key created");
        Ok(CreatedApiKey { key, secret })
    }

    /// The user's keys, hashes excluded by the model's serializer
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<ApiKey>> {
        self.api_key_repo
            .list_for_user(user_id)
            .await
            .map_err(AppError::from)
    }

    /// Soft-revoke a key; it stays listed but no longer authenticates
    pub async fn deactivate(&self, user_id: Uuid, key_id: Uuid) -> AppResult<()> {
        let deactivated = self
            .api_key_repo
            .deactivate(key_id, user_id)
            .await
            .map_err(AppError::from)?;
        if !deactivated {
            return Err(AppError::NotFound("API key not found".to_string()));
        }

        info!(user_id = %user_id, key_id = %key_id, "api key deactivated");
        Ok(())
    }
}
