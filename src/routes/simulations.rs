use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Simulation, SimulationType};
use crate::routes::{created, success, success_message, ApiResponse};
use crate::services::QuotaView;
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
        .route("/simulations", get(list).post(create))
        .route("/simulations/quota", get(quota))
        .route("/simulations/:id", get(get_one).delete(delete_one))
}

#[derive(Debug, Deserialize)]
struct CreateSimulationRequest {
    course_id: Uuid,
    simulation_type: String,
    title: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateSimulationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Simulation>>)> {
    let simulation_type = SimulationType::from_str(&body.simulation_type).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown simulation type: {}",
            body.simulation_type
        ))
    })?;

    let simulation = state
        .simulation_service
        .create(
            user.id,
            body.course_id,
            simulation_type,
            body.title,
            body.parameters,
        )
        .await?;
    Ok(created(simulation))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<ApiResponse<Vec<Simulation>>>> {
    let simulations = state
        .simulation_service
        .list(user.id, params.limit, params.offset)
        .await?;
    Ok(success(simulations))
}

async fn quota(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<QuotaView>>> {
    let quota = state.simulation_service.quota(user.id).await?;
    Ok(success(quota))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(simulation_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Simulation>>> {
    let simulation = state.simulation_service.get(user.id, simulation_id).await?;
    Ok(success(simulation))
}

async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(simulation_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .simulation_service
        .delete(user.id, simulation_id)
        .await?;
    Ok(success_message("Simulation deleted"))
}
