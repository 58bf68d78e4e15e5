use crate::error::AppResult;
use crate::middleware::{AuthUser, Identity};
use crate::models::PredictionEvaluation;
use crate::routes::{success, ApiResponse};
use crate::services::{AccuracyStats, PredictionView};
use crate::tasks::TaskRecord;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses/:id/prediction", get(for_course))
        .route("/courses/:id/prediction/refresh", post(refresh))
        .route("/predictions/accuracy", get(accuracy))
        .route("/predictions/:id/evaluation", get(evaluation))
        .route("/tasks/:id", get(task_status))
}

#[derive(Debug, Deserialize)]
struct AccuracyParams {
    days: Option<i64>,
}

async fn for_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    identity: Identity,
) -> AppResult<Json<ApiResponse<PredictionView>>> {
    let view = state
        .prediction_service
        .get_for_course(course_id, identity.user_id())
        .await?;
    Ok(success(view))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Value>>> {
    let task_id = state.prediction_service.refresh(course_id, user.id).await?;
    Ok(success(json!({ "task_id": task_id })))
}

async fn accuracy(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AccuracyParams>,
) -> AppResult<Json<ApiResponse<AccuracyStats>>> {
    let stats = state
        .prediction_service
        .accuracy(params.days.unwrap_or(30))
        .await?;
    Ok(success(stats))
}

async fn evaluation(
    State(state): State<Arc<AppState>>,
    Path(prediction_id): Path<Uuid>,
    _identity: Identity,
) -> AppResult<Json<ApiResponse<PredictionEvaluation>>> {
    let evaluation = state.prediction_service.evaluation(prediction_id).await?;
    Ok(success(evaluation))
}

async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TaskRecord>>> {
    let record = state
        .prediction_service
        .task_status(task_id, user.id)
        .await?;
    Ok(success(record))
}
