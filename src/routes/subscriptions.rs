use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{PaymentTransaction, SubscriptionPlan, UserSubscription};
use crate::routes::{success, ApiResponse};
use crate::services::{PromotionView, SubscriptionOutcome};
use crate::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subscriptions/plans", get(plans))
        .route("/subscriptions/current", get(current))
        .route("/subscriptions/subscribe", post(subscribe))
        .route("/subscriptions/cancel", post(cancel))
        .route("/subscriptions/promo/validate", post(validate_promo))
        .route("/subscriptions/payments", get(payments))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    plan_code: String,
    promo_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromoRequest {
    code: String,
}

/// Current subscription with its activity derived at read time
#[derive(Debug, Serialize)]
struct CurrentSubscription {
    subscription: Option<UserSubscription>,
    is_active: bool,
    level: String,
}

async fn plans(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<SubscriptionPlan>>>> {
    let plans = state.subscription_service.plans().await?;
    Ok(success(plans))
}

async fn current(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CurrentSubscription>>> {
    let now = chrono::Utc::now().naive_utc();
    let subscription = state.subscription_service.current(user.id).await?;

    let is_active = subscription
        .as_ref()
        .map(|s| s.is_active(now))
        .unwrap_or(false);
    let level = subscription
        .as_ref()
        .filter(|s| s.is_active(now))
        .map(|s| s.plan_code.clone())
        .unwrap_or_else(|| "free".to_string());

    Ok(success(CurrentSubscription {
        subscription,
        is_active,
        level,
    }))
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<SubscribeRequest>,
) -> AppResult<Json<ApiResponse<SubscriptionOutcome>>> {
    let outcome = state
        .subscription_service
        .subscribe(user.id, &body.plan_code, body.promo_code.as_deref())
        .await?;
    Ok(success(outcome))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserSubscription>>> {
    let subscription = state.subscription_service.cancel(user.id).await?;
    Ok(success(subscription))
}

async fn validate_promo(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(body): Json<PromoRequest>,
) -> AppResult<Json<ApiResponse<PromotionView>>> {
    let promotion = state
        .subscription_service
        .validate_promotion(&body.code)
        .await?;
    Ok(success(promotion))
}

async fn payments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<PaymentTransaction>>>> {
    let payments = state.subscription_service.payments(user.id).await?;
    Ok(success(payments))
}
