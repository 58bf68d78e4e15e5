use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Course, ParticipationDetail, RankedRunner};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Response of the model service's /predict endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    pub model_version: String,
    pub ranking: Vec<RankedRunner>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// HTTP client for the prediction model service
pub struct ModelClient {
    base_url: String,
    client: reqwest::Client,
}

impl ModelClient {
    /// Create a new ModelClient from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.model_api_url.clone(),
            client,
        }
    }

    /// Ask the model to rank the field of a course
    pub async fn predict(
        &self,
        course: &Course,
        field: &[ParticipationDetail],
    ) -> AppResult<PredictResponse> {
        let runners: Vec<serde_json::Value> = field
            .iter()
            .map(|p| {
                json!({
                    "numero": p.numero,
                    "cheval_id": p.cheval_id,
                    "cheval": p.cheval_name,
                    "jockey": p.jockey_name,
                    "weight_kg": p.weight_kg,
                    "odds": p.current_odds,
                })
            })
            .collect();

        let request_body = json!({
            "course": {
                "id": course.id,
                "hippodrome": course.hippodrome,
                "distance_m": course.distance_m,
                "discipline": course.discipline,
                "race_date": course.race_date,
            },
            "runners": runners,
        });

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, course_id = %course.id, "model service rejected predict request");
            return Err(AppError::ExternalService(format!(
                "Model service returned {}",
                status
            )));
        }

        let prediction = response.json::<PredictResponse>().await?;
        if prediction.ranking.is_empty() {
            return Err(AppError::ExternalService(
                "Model service returned an empty ranking".to_string(),
            ));
        }

        Ok(prediction)
    }

    /// Run a what-if simulation with user-supplied parameters
    pub async fn simulate(
        &self,
        course: &Course,
        simulation_type: &str,
        parameters: &serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let request_body = json!({
            "course_id": course.id,
            "simulation_type": simulation_type,
            "parameters": parameters,
        });

        let response = self
            .client
            .post(format!("{}/simulate", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, course_id = %course.id, "model service rejected simulate request");
            return Err(AppError::ExternalService(format!(
                "Model service returned {}",
                status
            )));
        }

        Ok(response.json::<serde_json::Value>().await?)
    }

    /// Ask the model service to start a retraining run
    pub async fn trigger_training(&self) -> AppResult<()> {
        let response = self
            .client
            .post(format!("{}/train", self.base_url))
            .json(&json!({}))
            .send()
            .await?;

        if response.status().is_success() {
            info!("model retraining triggered");
            Ok(())
        } else {
            Err(AppError::ExternalService(format!(
                "Model service returned {}",
                response.status()
            )))
        }
    }
}
