use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription lifecycle status matching the values stored in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubscriptionStatus::Pending),
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

/// Purchasable subscription plan
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub price: Decimal, // DECIMAL(8, 2) in database
    pub duration_days: i32,
    pub features: serde_json::Value, // JSONB in database
    pub active: bool,
}

/// One subscription period bought by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_code: String,
    pub status: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub auto_renew: bool,
    pub created_at: NaiveDateTime,
}

impl UserSubscription {
    /// Typed view of the stored status string
    pub fn status(&self) -> Option<SubscriptionStatus> {
        SubscriptionStatus::from_str(&self.status)
    }

    /// A subscription grants access only while active and inside its window
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        matches!(self.status(), Some(SubscriptionStatus::Active)) && self.end_date > now
    }
}

/// Recorded payment; the actual charge happens at an external provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: Decimal, // DECIMAL(8, 2) in database
    pub currency: String,
    pub status: String,
    pub provider_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Discount code applied at subscribe time
///
/// `max_uses` of zero means unlimited redemptions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromotionCode {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: i32,
    pub valid_from: NaiveDateTime,
    pub valid_until: NaiveDateTime,
    pub max_uses: i32,
    pub use_count: i32,
    pub active: bool,
}

impl PromotionCode {
    /// A code is redeemable inside its validity window, while active, and
    /// while redemptions remain
    pub fn is_valid(&self, now: NaiveDateTime) -> bool {
        if !self.active {
            return false;
        }
        if now < self.valid_from || now > self.valid_until {
            return false;
        }
        self.max_uses == 0 || self.use_count < self.max_uses
    }

    /// Price after applying the discount, never below zero
    pub fn apply(&self, price: Decimal) -> Decimal {
        let discount = price * Decimal::from(self.discount_percent) / Decimal::from(100);
        let discounted = price - discount;
        if discounted < Decimal::ZERO {
            Decimal::ZERO
        } else {
            discounted
        }
    }
}
