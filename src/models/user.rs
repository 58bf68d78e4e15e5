use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription level attached to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionLevel {
    Free,
    Standard,
    Premium,
}

impl SubscriptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Free => "free",
            SubscriptionLevel::Standard => "standard",
            SubscriptionLevel::Premium => "premium",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionLevel::Free),
            "standard" => Some(SubscriptionLevel::Standard),
            "premium" => Some(SubscriptionLevel::Premium),
            _ => None,
        }
    }
}

/// User model representing an account indexed by email address
///
/// `password_hash` is `None` for accounts created through a federated
/// identity provider; such accounts cannot log in with a password.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub display_name: String,
    pub subscription_level: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_login_at: Option<NaiveDateTime>,
}

impl User {
    /// Create a new User (typically used for creating from API input)
    pub fn new(email: String, password_hash: Option<String>, display_name: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            display_name,
            subscription_level: SubscriptionLevel::Free.as_str().to_string(),
            email_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Typed view of the stored subscription level
    pub fn level(&self) -> SubscriptionLevel {
        SubscriptionLevel::from_str(&self.subscription_level).unwrap_or(SubscriptionLevel::Free)
    }

    /// Public profile view, safe to return to API clients
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            subscription_level: self.subscription_level.clone(),
            email_verified: self.email_verified,
            created_at: self.created_at,
        }
    }
}

/// Reduced user representation returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub subscription_level: String,
    pub email_verified: bool,
    pub created_at: NaiveDateTime,
}
