use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Horse registered in the reference data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cheval {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub rating: Option<i32>,
    pub created_at: NaiveDateTime,
}

/// Jockey registered in the reference data
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Jockey {
    pub id: Uuid,
    pub name: String,
    pub win_rate: Option<Decimal>, // DECIMAL(5, 4) in database
    pub created_at: NaiveDateTime,
}

/// Participation of one horse in one course
///
/// `numero` is the saddle number printed on the program; it is unique
/// within a course, as is the horse itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participation {
    pub id: Uuid,
    pub course_id: Uuid,
    pub cheval_id: Uuid,
    pub jockey_id: Option<Uuid>,
    pub numero: i32,
    pub weight_kg: Option<Decimal>,   // DECIMAL(5, 2) in database
    pub current_odds: Option<Decimal>, // DECIMAL(8, 2) in database
    pub final_position: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl Participation {
    /// Create a new Participation
    pub fn new(course_id: Uuid, cheval_id: Uuid, jockey_id: Option<Uuid>, numero: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            cheval_id,
            jockey_id,
            numero,
            weight_kg: None,
            current_odds: None,
            final_position: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Validate participation fields before persisting
    pub fn validate(&self) -> Result<(), String> {
        if self.numero <= 0 {
            return Err("Saddle number must be greater than zero".to_string());
        }
        if let Some(odds) = self.current_odds {
            if odds <= Decimal::ZERO {
                return Err("Odds must be greater than zero".to_string());
            }
        }
        Ok(())
    }
}

/// Participation joined with horse and jockey names, as returned by
/// the course detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipationDetail {
    pub id: Uuid,
    pub course_id: Uuid,
    pub cheval_id: Uuid,
    pub numero: i32,
    pub cheval_name: String,
    pub jockey_name: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub current_odds: Option<Decimal>,
    pub final_position: Option<i32>,
}
