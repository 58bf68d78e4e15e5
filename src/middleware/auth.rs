use crate::auth;
use crate::error::AppError;
use crate::models::{ApiKey, SubscriptionLevel};
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use std::sync::Arc;
use uuid::Uuid;

/// Header carrying the API key secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated account, extracted from a Bearer access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub level: SubscriptionLevel,
}

/// Authenticated API client, extracted from the X-Api-Key header
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub key: ApiKey,
}

/// Caller identity for endpoints that accept either credential
#[derive(Debug, Clone)]
pub enum Identity {
    User(AuthUser),
    Api(ApiClient),
}

impl Identity {
    /// Account this request acts on behalf of
    pub fn user_id(&self) -> Uuid {
        match self {
            Identity::User(user) => user.id,
            Identity::Api(client) => client.key.user_id,
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = auth::verify_access_token(&state.config.auth, token)?;

        let level = SubscriptionLevel::from_str(&claims.level).unwrap_or(SubscriptionLevel::Free);

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            level,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ApiClient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing X-Api-Key header".to_string()))?;

        let hash = auth::hash_api_key(secret);
        let key = state
            .api_key_repo
            .find_by_hash(&hash)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Unauthorized("Unknown API key".to_string()))?;

        // Deactivated and expired keys are authenticated but rejected,
        // which distinguishes 403 from the 401 of an unknown key.
        if !key.active {
            return Err(AppError::Forbidden("API key is deactivated".to_string()));
        }
        if key.is_expired(chrono::Utc::now().naive_utc()) {
            return Err(AppError::Forbidden("API key is expired".to_string()));
        }

        state
            .api_key_repo
            .touch_last_used(key.id)
            .await
            .map_err(AppError::from)?;

        Ok(ApiClient { key })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Identity::User(
                AuthUser::from_request_parts(parts, state).await?,
            ));
        }
        if parts.headers.contains_key(API_KEY_HEADER) {
            return Ok(Identity::Api(ApiClient::from_request_parts(parts, state).await?));
        }

        Err(AppError::Unauthorized("Missing credentials".to_string()))
    }
}
