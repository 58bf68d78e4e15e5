use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Simulation variant; `Animation` is restricted to premium accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationType {
    Standard,
    /// Side-by-side run of two parameter sets
    Comparison,
    Animation,
}

impl SimulationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationType::Standard => "standard",
            SimulationType::Comparison => "comparison",
            SimulationType::Animation => "animation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(SimulationType::Standard),
            "comparison" => Some(SimulationType::Comparison),
            "animation" => Some(SimulationType::Animation),
            _ => None,
        }
    }
}

/// Stored what-if simulation for a course
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Simulation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub simulation_type: String,
    pub title: Option<String>,
    /// User-chosen inputs (e.g. weather, surcharge weights) forwarded to
    /// the model service
    pub parameters: serde_json::Value, // JSONB in database
    pub results: Option<serde_json::Value>, // JSONB in database
    pub created_at: NaiveDateTime,
}

impl Simulation {
    pub fn new(
        user_id: Uuid,
        course_id: Uuid,
        simulation_type: SimulationType,
        title: Option<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            simulation_type: simulation_type.as_str().to_string(),
            title,
            parameters,
            results: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Typed view of the stored simulation type
    pub fn simulation_type(&self) -> Option<SimulationType> {
        SimulationType::from_str(&self.simulation_type)
    }

    /// Validate simulation fields before persisting
    pub fn validate(&self) -> Result<(), String> {
        if SimulationType::from_str(&self.simulation_type).is_none() {
            return Err(format!("Unknown simulation type: {}", self.simulation_type));
        }
        if !self.parameters.is_object() {
            return Err("Simulation parameters must be a JSON object".to_string());
        }
        Ok(())
    }
}

/// Daily simulation counter, one row per user per calendar day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SimulationUsage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub usage_date: NaiveDate,
    pub count: i32,
}
