use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// API key for programmatic access
///
/// Only the SHA-256 hash of the secret is stored; `prefix` keeps the
/// first characters so users can tell their keys apart in listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub prefix: String,
    pub active: bool,
    pub expires_at: Option<NaiveDateTime>,
    pub last_used_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl ApiKey {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    /// A key authenticates requests only while active and unexpired
    pub fn is_usable(&self, now: NaiveDateTime) -> bool {
        self.active && !self.is_expired(now)
    }
}
