use crate::clients::ModelClient;
use crate::error::AppResult;
use crate::services::PredictionService;
use crate::tasks::TaskRegistry;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// How far back each sweep looks for finished courses, in days
const EVALUATION_WINDOW_DAYS: i64 = 7;

/// Scores recent predictions against results and nudges the model to retrain
///
/// Retraining is only requested when a sweep produced new evaluations, so an
/// idle week does not hammer the model service.
pub struct TrainingTask {
    prediction_service: Arc<PredictionService>,
    model_client: Arc<ModelClient>,
    registry: Arc<TaskRegistry>,
    interval: Duration,
}

impl TrainingTask {
    pub fn new(
        prediction_service: Arc<PredictionService>,
        model_client: Arc<ModelClient>,
        registry: Arc<TaskRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            prediction_service,
            model_client,
            registry,
            interval,
        }
    }

    /// Run the evaluation loop until the process exits
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!("training check started, sweeping every {:?}", self.interval);

        loop {
            interval.tick().await;

            let task_id = self.registry.enqueue("training_check", None).await;
            self.registry.mark_running(task_id).await;
            match self.sweep().await {
                Ok(summary) => {
                    self.registry.mark_succeeded(task_id, Some(summary)).await;
                }
                Err(e) => {
                    error!("training check failed: {}", e);
                    self.registry.mark_failed(task_id, &e.to_string()).await;
                }
            }
        }
    }

    /// Evaluate recently finished courses, then retrain if anything was new
    async fn sweep(&self) -> AppResult<serde_json::Value> {
        let since = Utc::now().naive_utc() - chrono::Duration::days(EVALUATION_WINDOW_DAYS);

        let evaluated = self.prediction_service.evaluate_finished_courses(since).await?;

        let mut training_triggered = false;
        if evaluated > 0 {
            self.model_client.trigger_training().await?;
            training_triggered = true;
        }

        Ok(json!({
            "evaluated": evaluated,
            "training_triggered": training_triggered,
        }))
    }
}
