use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Single-use token for the password reset flow
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub used: bool,
    pub created_at: NaiveDateTime,
}

impl PasswordResetToken {
    pub fn is_usable(&self, now: NaiveDateTime) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Single-use token for the email verification flow
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub used: bool,
    pub created_at: NaiveDateTime,
}

impl VerificationToken {
    pub fn is_usable(&self, now: NaiveDateTime) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Opaque refresh token; rotated on every use
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub revoked: bool,
    pub created_at: NaiveDateTime,
}

impl RefreshToken {
    pub fn is_usable(&self, now: NaiveDateTime) -> bool {
        !self.revoked && self.expires_at > now
    }
}
