use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One entry of a prediction ranking, stored inside the JSONB column
///
/// Entries are ordered best first; the position in the array is the rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRunner {
    pub numero: i32,
    pub cheval_id: Uuid,
    /// Win probability in [0, 1] as estimated by the model
    pub probability: f64,
}

/// Stored model prediction for a course
///
/// `ranking` is the full ordered field as produced by the model service.
/// Tier-based truncation happens at read time, never at storage time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub course_id: Uuid,
    pub model_version: String,
    pub ranking: serde_json::Value, // JSONB in database
    pub confidence: Option<Decimal>, // DECIMAL(5, 4) in database
    pub created_at: NaiveDateTime,
}

impl Prediction {
    pub fn new(
        course_id: Uuid,
        model_version: String,
        ranking: serde_json::Value,
        confidence: Option<Decimal>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            model_version,
            ranking,
            confidence,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Decode the stored ranking column
    pub fn runners(&self) -> Result<Vec<RankedRunner>, serde_json::Error> {
        serde_json::from_value(self.ranking.clone())
    }

    /// Ranking truncated to the first `n` places, re-encoded for the API
    pub fn truncated_ranking(&self, n: usize) -> Result<serde_json::Value, serde_json::Error> {
        let mut runners = self.runners()?;
        runners.truncate(n);
        serde_json::to_value(runners)
    }
}

/// Post-race accuracy record for one prediction
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PredictionEvaluation {
    pub id: Uuid,
    pub prediction_id: Uuid,
    /// Saddle numbers in actual finishing order
    pub actual_order: serde_json::Value, // JSONB in database
    pub winner_hit: bool,
    pub podium_hits: i32,
    pub rank_correlation: Option<Decimal>, // DECIMAL(6, 4) in database
    pub evaluated_at: NaiveDateTime,
}

impl PredictionEvaluation {
    /// Compare a predicted ranking against the actual finishing order
    ///
    /// `podium_hits` counts predicted top-3 horses that finished top-3,
    /// regardless of exact position.
    pub fn score(predicted: &[i32], actual: &[i32]) -> (bool, i32) {
        let winner_hit = match (predicted.first(), actual.first()) {
            (Some(p), Some(a)) => p == a,
            _ => false,
        };

        let predicted_podium: Vec<i32> = predicted.iter().take(3).copied().collect();
        let actual_podium: Vec<i32> = actual.iter().take(3).copied().collect();
        let podium_hits = predicted_podium
            .iter()
            .filter(|n| actual_podium.contains(n))
            .count() as i32;

        (winner_hit, podium_hits)
    }
}
