use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::UserProfile;
use crate::routes::{success, success_message, ApiResponse};
use crate::AppState;
use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/me",
            get(profile).put(update_profile).delete(deactivate),
        )
        .route("/users/me/password", put(change_password))
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.user_service.profile(user.id).await?;
    Ok(success(profile))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state
        .user_service
        .update_profile(user.id, &body.display_name)
        .await?;
    Ok(success(profile))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .user_service
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(success_message("Password changed"))
}

async fn deactivate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state.user_service.deactivate(user.id).await?;
    Ok(success_message("Account deactivated"))
}
