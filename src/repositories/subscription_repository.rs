//! Repository for subscription plans, periods, payments and promotion codes

use crate::error::RepositoryError;
use crate::models::{PaymentTransaction, PromotionCode, SubscriptionPlan, UserSubscription};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Plans
    // =========================================================================

    /// All plans currently offered, cheapest first
    pub async fn list_active_plans(&self) -> Result<Vec<SubscriptionPlan>, RepositoryError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, code, name, price, duration_days, features, active
            FROM subscription_plans
            WHERE active = TRUE
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    /// Find a plan by its stable code
    pub async fn find_plan(&self, code: &str) -> Result<Option<SubscriptionPlan>, RepositoryError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, code, name, price, duration_days, features, active
            FROM subscription_plans
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    // =========================================================================
    // Subscription periods
    // =========================================================================

    /// The subscription currently granting access, if any
    pub async fn current_for_user(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Option<UserSubscription>, RepositoryError> {
        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT id, user_id, plan_code, status, start_date, end_date, auto_renew, created_at
            FROM user_subscriptions
            WHERE user_id = $1 AND status = 'active' AND end_date > $2
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Open a paid subscription period and record its payment in one
    /// transaction
    ///
    /// When a promotion code id is given, its redemption counter is bumped
    /// inside the same transaction; an exhausted or deactivated code aborts
    /// the whole purchase.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        plan_code: &str,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
        amount: Decimal,
        currency: &str,
        promotion_id: Option<Uuid>,
    ) -> Result<(UserSubscription, PaymentTransaction), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(promo_id) = promotion_id {
            let redeemed: Option<(Uuid,)> = sqlx::query_as(
                r#"
                UPDATE promotion_codes
                SET use_count = use_count + 1
                WHERE id = $1 AND active = TRUE AND (max_uses = 0 OR use_count < max_uses)
                RETURNING id
                "#,
            )
            .bind(promo_id)
            .fetch_optional(&mut *tx)
            .await?;

            if redeemed.is_none() {
                return Err(RepositoryError::BusinessRule(
                    "Promotion code is no longer redeemable".to_string(),
                ));
            }
        }

        // Close any overlapping active period before opening the new one
        sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled'
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            INSERT INTO user_subscriptions (user_id, plan_code, status, start_date, end_date)
            VALUES ($1, $2, 'active', $3, $4)
            RETURNING id, user_id, plan_code, status, start_date, end_date, auto_renew, created_at
            "#,
        )
        .bind(user_id)
        .bind(plan_code)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *tx)
        .await?;

        let payment = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            INSERT INTO payment_transactions (user_id, subscription_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, 'completed')
            RETURNING id, user_id, subscription_id, amount, currency, status, provider_ref, created_at
            "#,
        )
        .bind(user_id)
        .bind(subscription.id)
        .bind(amount)
        .bind(currency)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((subscription, payment))
    }

    /// Cancel the user's active subscription
    pub async fn cancel_active(&self, user_id: Uuid) -> Result<Option<UserSubscription>, RepositoryError> {
        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled', auto_renew = FALSE
            WHERE user_id = $1 AND status = 'active'
            RETURNING id, user_id, plan_code, status, start_date, end_date, auto_renew, created_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Expire periods whose end date has passed
    ///
    /// Returns the ids of the affected users so their cached level can be
    /// downgraded.
    pub async fn expire_overdue(&self, now: NaiveDateTime) -> Result<Vec<Uuid>, RepositoryError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE user_subscriptions
            SET status = 'expired'
            WHERE status = 'active' AND end_date <= $1
            RETURNING user_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // =========================================================================
    // Promotion codes
    // =========================================================================

    /// Find a promotion code by its public value
    pub async fn find_promotion(&self, code: &str) -> Result<Option<PromotionCode>, RepositoryError> {
        let promo = sqlx::query_as::<_, PromotionCode>(
            r#"
            SELECT id, code, discount_percent, valid_from, valid_until, max_uses, use_count, active
            FROM promotion_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Payment history of one user, newest first
    pub async fn payments_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PaymentTransaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, user_id, subscription_id, amount, currency, status, provider_ref, created_at
            FROM payment_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
