use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{Notification, NotificationSettings, UserDevice};
use crate::routes::{created, success, success_message, ApiResponse};
use crate::services::SettingsPatch;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/:id/read", put(mark_read))
        .route("/notifications/read-all", put(mark_all_read))
        .route(
            "/notifications/settings",
            get(settings).put(update_settings),
        )
        .route("/notifications/devices", post(register_device))
        .route("/notifications/devices/:id", delete(remove_device))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    unread_only: Option<bool>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RegisterDeviceRequest {
    device_token: String,
    platform: String,
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = state
        .notification_service
        .list(
            user.id,
            params.unread_only.unwrap_or(false),
            params.limit,
            params.offset,
        )
        .await?;
    Ok(success(notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .notification_service
        .mark_read(user.id, notification_id)
        .await?;
    Ok(success_message("Notification marked read"))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Value>>> {
    let updated = state.notification_service.mark_all_read(user.id).await?;
    Ok(success(json!({ "updated": updated })))
}

async fn settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<NotificationSettings>>> {
    let settings = state.notification_service.settings(user.id).await?;
    Ok(success(settings))
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(patch): Json<SettingsPatch>,
) -> AppResult<Json<ApiResponse<NotificationSettings>>> {
    let settings = state
        .notification_service
        .update_settings(user.id, patch)
        .await?;
    Ok(success(settings))
}

async fn register_device(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<RegisterDeviceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserDevice>>)> {
    let device = state
        .notification_service
        .register_device(user.id, &body.device_token, &body.platform)
        .await?;
    Ok(created(device))
}

async fn remove_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .notification_service
        .remove_device(user.id, device_id)
        .await?;
    Ok(success_message("Device removed"))
}
