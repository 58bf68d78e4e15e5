//! REST surface: versioned `/api/v1` routes over the service layer

pub mod api_keys;
pub mod auth;
pub mod courses;
pub mod notifications;
pub mod predictions;
pub mod simulations;
pub mod subscriptions;
pub mod users;

use crate::database;
use crate::middleware::rate_limit_middleware;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// JSON envelope wrapping every API response body
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 envelope carrying data
pub(crate) fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data: Some(data),
    })
}

/// 200 envelope carrying only a message
pub(crate) fn success_message(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_string()),
        data: None,
    })
}

/// 201 envelope carrying the created resource
pub(crate) fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, success(data))
}

/// Compose the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_v1 = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(courses::router())
        .merge(predictions::router())
        .merge(simulations::router())
        .merge(subscriptions::router())
        .merge(notifications::router())
        .merge(api_keys::router());

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe; reports whether the database answers
async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database_up = database::health_check(state.database.pool()).await.is_ok();
    Json(json!({ "status": "ok", "database": database_up }))
}
