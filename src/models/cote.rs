use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One historical odds snapshot for a participation
///
/// Rows are append-only; the application never updates or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoteHistorique {
    pub id: Uuid,
    pub participation_id: Uuid,
    pub cote: Decimal, // DECIMAL(8, 2) in database
    pub recorded_at: NaiveDateTime,
}

impl CoteHistorique {
    pub fn new(participation_id: Uuid, cote: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            participation_id,
            cote,
            recorded_at: chrono::Utc::now().naive_utc(),
        }
    }
}
