use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::ApiKey;
use crate::routes::{created, success, success_message, ApiResponse};
use crate::services::CreatedApiKey;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api-keys", get(list).post(create))
        .route("/api-keys/:id", delete(deactivate))
}

#[derive(Debug, Deserialize)]
struct CreateKeyRequest {
    label: String,
    expires_in_days: Option<i64>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateKeyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedApiKey>>)> {
    // The plaintext secret appears in this response and nowhere else
    let key = state
        .api_key_service
        .create(user.id, &body.label, body.expires_in_days)
        .await?;
    Ok(created(key))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ApiKey>>>> {
    let keys = state.api_key_service.list(user.id).await?;
    Ok(success(keys))
}

async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path(key_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state.api_key_service.deactivate(user.id, key_id).await?;
    Ok(success_message("API key deactivated"))
}
