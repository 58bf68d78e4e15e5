use crate::error::{AppError, AppResult};
use crate::models::{
    Notification, NotificationKind, PaymentTransaction, SubscriptionLevel, SubscriptionPlan,
    UserSubscription,
};
use crate::repositories::{NotificationRepository, SubscriptionRepository, UserRepository};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a successful plan purchase
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOutcome {
    pub subscription: UserSubscription,
    pub payment: PaymentTransaction,
    pub applied_discount_percent: Option<i32>,
}

/// A promotion code confirmed to be currently redeemable
#[derive(Debug, Clone, Serialize)]
pub struct PromotionView {
    pub code: String,
    pub discount_percent: i32,
}

/// Plan catalogue, purchases, cancellation and payment history
pub struct SubscriptionService {
    subscription_repo: Arc<SubscriptionRepository>,
    user_repo: Arc<UserRepository>,
    notification_repo: Arc<NotificationRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<SubscriptionRepository>,
        user_repo: Arc<UserRepository>,
        notification_repo: Arc<NotificationRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            notification_repo,
        }
    }

    pub async fn plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        self.subscription_repo
            .list_active_plans()
            .await
            .map_err(AppError::from)
    }

    /// The subscription currently granting access, if any
    pub async fn current(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        let now = Utc::now().naive_utc();
        self.subscription_repo
            .current_for_user(user_id, now)
            .await
            .map_err(AppError::from)
    }

    /// Buy a plan, optionally with a promotion code
    ///
    /// Replaces any running subscription and updates the user's cached
    /// level in the same request.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        plan_code: &str,
        promo_code: Option<&str>,
    ) -> AppResult<SubscriptionOutcome> {
        let plan = self
            .subscription_repo
            .find_plan(plan_code)
            .await
            .map_err(AppError::from)?
            .filter(|p| p.active)
            .ok_or_else(|| AppError::Validation("Unknown subscription plan".to_string()))?;

        if plan.code == SubscriptionLevel::Free.as_str() {
            return Err(AppError::Validation(
                "The free tier does not require a subscription".to_string(),
            ));
        }

        // Plan codes double as subscription levels on the user row
        let level = SubscriptionLevel::from_str(&plan.code).ok_or_else(|| {
            AppError::Config(format!(
                "Plan {} does not map to a subscription level",
                plan.code
            ))
        })?;

        let now = Utc::now().naive_utc();

        let (amount, promotion_id, applied_discount_percent) = match promo_code {
            Some(code) => {
                let promo = self
                    .subscription_repo
                    .find_promotion(code.trim())
                    .await
                    .map_err(AppError::from)?
                    .ok_or_else(|| {
                        AppError::Validation("Unknown promotion code".to_string())
                    })?;
                if !promo.is_valid(now) {
                    return Err(AppError::Validation(
                        "Promotion code is expired or exhausted".to_string(),
                    ));
                }
                (promo.apply(plan.price), Some(promo.id), Some(promo.discount_percent))
            }
            None => (plan.price, None, None),
        };

        let end_date = now + Duration::days(plan.duration_days as i64);

        let (subscription, payment) = self
            .subscription_repo
            .subscribe(user_id, &plan.code, now, end_date, amount, "EUR", promotion_id)
            .await
            .map_err(AppError::from)?;

        self.user_repo
            .set_subscription_level(user_id, level.as_str())
            .await
            .map_err(AppError::from)?;

        self.notify_subscription_change(
            user_id,
            "Abonnement activé".to_string(),
            format!(
                "Votre abonnement {} est actif jusqu'au {}.",
                plan.name,
                end_date.format("%d/%m/%Y")
            ),
        )
        .await;

        info!(
            user_id = %user_id,
            plan = %plan.code,
            amount = %payment.amount,
            "subscription opened"
        );

        Ok(SubscriptionOutcome {
            subscription,
            payment,
            applied_discount_percent,
        })
    }

    /// Cancel the running subscription
    ///
    /// Access ends immediately and the account drops back to the free tier;
    /// there is no proration since payments are recorded one-shot.
    pub async fn cancel(&self, user_id: Uuid) -> AppResult<UserSubscription> {
        let subscription = self
            .subscription_repo
            .cancel_active(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("No active subscription".to_string()))?;

        self.user_repo
            .set_subscription_level(user_id, SubscriptionLevel::Free.as_str())
            .await
            .map_err(AppError::from)?;

        self.notify_subscription_change(
            user_id,
            "Abonnement résilié".to_string(),
            "Votre abonnement a été résilié; votre compte repasse en formule Découverte."
                .to_string(),
        )
        .await;

        info!(user_id = %user_id, plan = %subscription.plan_code, "subscription cancelled");
        Ok(subscription)
    }

    /// Check a promotion code without redeeming it
    ///
    /// Unknown, expired and exhausted codes all answer with the same
    /// validation error.
    pub async fn validate_promotion(&self, code: &str) -> AppResult<PromotionView> {
        let code = code.trim();
        let now = Utc::now().naive_utc();

        let promo = self
            .subscription_repo
            .find_promotion(code)
            .await
            .map_err(AppError::from)?
            .filter(|p| p.is_valid(now))
            .ok_or_else(|| {
                AppError::Validation("Promotion code is invalid or expired".to_string())
            })?;

        Ok(PromotionView {
            code: promo.code,
            discount_percent: promo.discount_percent,
        })
    }

    pub async fn payments(&self, user_id: Uuid) -> AppResult<Vec<PaymentTransaction>> {
        self.subscription_repo
            .payments_for_user(user_id)
            .await
            .map_err(AppError::from)
    }

    /// Store an in-app notification about the change, logging failures
    /// instead of failing the purchase
    async fn notify_subscription_change(&self, user_id: Uuid, title: String, body: String) {
        let notification = Notification::new(user_id, title, body, NotificationKind::System, None);
        if let Err(e) = self.notification_repo.create(&notification).await {
            warn!(user_id = %user_id, error = %e, "failed to store subscription notification");
        }
    }
}

