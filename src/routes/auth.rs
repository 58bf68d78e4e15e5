use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::routes::{created, success, success_message, ApiResponse};
use crate::services::AuthTokens;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/federated", post(federated))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    token: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct VerifyEmailRequest {
    token: String,
}

#[derive(Debug, Deserialize)]
struct FederatedRequest {
    provider: String,
    provider_token: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthTokens>>)> {
    let tokens = state
        .auth_service
        .register(&body.email, &body.password, body.display_name.as_deref())
        .await?;
    Ok(created(tokens))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    let tokens = state.auth_service.login(&body.email, &body.password).await?;
    Ok(success(tokens))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    let tokens = state.auth_service.refresh(&body.refresh_token).await?;
    Ok(success(tokens))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth_service.logout(&body.refresh_token).await?;
    Ok(success_message("Logged out"))
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth_service.forgot_password(&body.email).await?;
    Ok(success_message(
        "If that address has an account, a reset link has been sent",
    ))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .auth_service
        .reset_password(&body.token, &body.new_password)
        .await?;
    Ok(success_message("Password updated"))
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth_service.verify_email(&body.token).await?;
    Ok(success_message("Email verified"))
}

async fn resend_verification(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth_service.resend_verification(user.id).await?;
    Ok(success_message("Verification email sent"))
}

async fn federated(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FederatedRequest>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    let tokens = state
        .auth_service
        .federated_login(&body.provider, &body.provider_token)
        .await?;
    Ok(success(tokens))
}
