use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{CommentaireDetail, CoteHistorique, Course, ParticipationDetail};
use crate::routes::{created, success, ApiResponse};
use crate::services::CourseDetail;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses/upcoming", get(upcoming))
        .route("/courses/:id", get(detail))
        .route("/courses/:id/participations", get(participations))
        .route("/participations/:id/cotes", get(cotes))
        .route(
            "/courses/:id/commentaires",
            get(commentaires).post(add_commentaire),
        )
}

#[derive(Debug, Deserialize)]
struct UpcomingParams {
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CommentaireRequest {
    content: String,
}

async fn upcoming(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpcomingParams>,
) -> AppResult<Json<ApiResponse<Vec<Course>>>> {
    let courses = state.course_service.upcoming(params.days).await?;
    Ok(success(courses))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CourseDetail>>> {
    let detail = state.course_service.detail(course_id).await?;
    Ok(success(detail))
}

async fn participations(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<ParticipationDetail>>>> {
    let entries = state.course_service.participations(course_id).await?;
    Ok(success(entries))
}

async fn cotes(
    State(state): State<Arc<AppState>>,
    Path(participation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CoteHistorique>>>> {
    let history = state
        .course_service
        .cotes_for_participation(participation_id)
        .await?;
    Ok(success(history))
}

async fn commentaires(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CommentaireDetail>>>> {
    let comments = state.course_service.commentaires(course_id).await?;
    Ok(success(comments))
}

async fn add_commentaire(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    user: AuthUser,
    Json(body): Json<CommentaireRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CommentaireDetail>>)> {
    let comment = state
        .course_service
        .add_commentaire(course_id, user.id, &body.content)
        .await?;
    Ok(created(comment))
}
