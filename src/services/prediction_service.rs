use crate::clients::ModelClient;
use crate::error::{AppError, AppResult};
use crate::models::{
    Notification, NotificationKind, Prediction, PredictionEvaluation, SubscriptionLevel,
};
use crate::repositories::{
    CourseRepository, NotificationRepository, PredictionRepository, UserRepository,
};
use crate::tasks::{TaskRecord, TaskRegistry};
use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// How many ranking places the free tier sees
const FREE_RANKING_LIMIT: usize = 3;

/// Prediction as served to a given user
///
/// Free accounts get the ranking truncated to the podium; paid tiers get
/// the full field.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub model_version: String,
    pub ranking: serde_json::Value,
    pub confidence: Option<Decimal>,
    pub truncated: bool,
    pub created_at: NaiveDateTime,
}

/// Rolling accuracy over recently evaluated predictions
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyStats {
    pub window_days: i64,
    pub evaluated: i64,
    pub winner_hits: i64,
    pub winner_hit_rate: f64,
}

/// Model predictions: serving, refreshing and post-race evaluation
pub struct PredictionService {
    prediction_repo: Arc<PredictionRepository>,
    course_repo: Arc<CourseRepository>,
    user_repo: Arc<UserRepository>,
    notification_repo: Arc<NotificationRepository>,
    model_client: Arc<ModelClient>,
    registry: Arc<TaskRegistry>,
}

impl PredictionService {
    pub fn new(
        prediction_repo: Arc<PredictionRepository>,
        course_repo: Arc<CourseRepository>,
        user_repo: Arc<UserRepository>,
        notification_repo: Arc<NotificationRepository>,
        model_client: Arc<ModelClient>,
        registry: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            prediction_repo,
            course_repo,
            user_repo,
            notification_repo,
            model_client,
            registry,
        }
    }

    /// Latest stored prediction for a course
    ///
    /// Predictions are produced by the refresh task, never inline, so a
    /// course nobody refreshed yet reads as 404.
    pub async fn get_for_course(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<PredictionView> {
        let level = self.current_level(user_id).await?;

        let prediction = self
            .prediction_repo
            .latest_for_course(course_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::NotFound("No prediction available for this course yet".to_string())
            })?;

        view_for_level(prediction, level)
    }

    /// Queue a background regeneration and return the task id
    ///
    /// Refreshing hits the model service, so it is reserved for paid tiers;
    /// free accounts keep the cached prediction.
    pub async fn refresh(&self, course_id: Uuid, user_id: Uuid) -> AppResult<Uuid> {
        let level = self.current_level(user_id).await?;
        if level == SubscriptionLevel::Free {
            return Err(AppError::Forbidden(
                "Prediction refresh requires a paid subscription".to_string(),
            ));
        }

        let course = self
            .course_repo
            .find_by_id(course_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let course_repo = Arc::clone(&self.course_repo);
        let prediction_repo = Arc::clone(&self.prediction_repo);
        let notification_repo = Arc::clone(&self.notification_repo);
        let model_client = Arc::clone(&self.model_client);
        let task_id = self
            .registry
            .spawn_job("prediction_refresh", Some(user_id), async move {
                let prediction =
                    generate_prediction(&course_repo, &prediction_repo, &model_client, course_id)
                        .await?;
                info!(course_id = %course_id, prediction_id = %prediction.id, "prediction refreshed");

                let notification = Notification::new(
                    user_id,
                    "Pronostic actualisé".to_string(),
                    format!("Le pronostic de {} a été recalculé", course.name),
                    NotificationKind::PredictionAlert,
                    Some(json!({ "course_id": course_id, "prediction_id": prediction.id })),
                );
                if let Err(e) = notification_repo.create(&notification).await {
                    warn!(user_id = %user_id, error = %e, "failed to store refresh notification");
                }

                Ok(Some(json!({ "prediction_id": prediction.id })))
            })
            .await;

        info!(course_id = %course_id, task_id = %task_id, "prediction refresh queued");
        Ok(task_id)
    }

    /// Status of a refresh task started by this user
    pub async fn task_status(&self, task_id: Uuid, user_id: Uuid) -> AppResult<TaskRecord> {
        let record = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

        // Tasks are only visible to the user who started them
        if record.owner.map(|owner| owner != user_id).unwrap_or(false) {
            return Err(AppError::NotFound("Task not found".to_string()));
        }

        Ok(record)
    }

    /// Stored evaluation of one prediction; 404 until the course is scored
    pub async fn evaluation(&self, prediction_id: Uuid) -> AppResult<PredictionEvaluation> {
        self.prediction_repo
            .find_by_id(prediction_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Prediction not found".to_string()))?;

        self.prediction_repo
            .evaluation_for(prediction_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::NotFound("Prediction has not been evaluated yet".to_string())
            })
    }

    /// Score the latest prediction against recorded final positions
    ///
    /// Returns `None` when there is nothing to evaluate yet: no prediction,
    /// or no results recorded. Already-evaluated predictions are returned
    /// as-is, so the caller can invoke this idempotently after each sync.
    pub async fn evaluate_course(&self, course_id: Uuid) -> AppResult<Option<PredictionEvaluation>> {
        let prediction = match self
            .prediction_repo
            .latest_for_course(course_id)
            .await
            .map_err(AppError::from)?
        {
            Some(prediction) => prediction,
            None => return Ok(None),
        };

        if let Some(existing) = self
            .prediction_repo
            .evaluation_for(prediction.id)
            .await
            .map_err(AppError::from)?
        {
            return Ok(Some(existing));
        }

        let participations = self
            .course_repo
            .participations_for_course(course_id)
            .await
            .map_err(AppError::from)?;

        let mut finishers: Vec<(i32, i32)> = participations
            .iter()
            .filter_map(|p| p.final_position.map(|pos| (pos, p.numero)))
            .collect();
        if finishers.is_empty() {
            return Ok(None);
        }
        finishers.sort();
        let actual: Vec<i32> = finishers.into_iter().map(|(_, numero)| numero).collect();

        let predicted: Vec<i32> = prediction.runners()?.iter().map(|r| r.numero).collect();

        let (winner_hit, podium_hits) = PredictionEvaluation::score(&predicted, &actual);
        let rank_correlation = spearman(&predicted, &actual).and_then(Decimal::from_f64_retain);

        let evaluation = self
            .prediction_repo
            .create_evaluation(
                prediction.id,
                &serde_json::to_value(&actual)?,
                winner_hit,
                podium_hits,
                rank_correlation,
            )
            .await
            .map_err(AppError::from)?;

        info!(
            course_id = %course_id,
            winner_hit,
            podium_hits,
            "prediction evaluated"
        );
        Ok(Some(evaluation))
    }

    /// Evaluate predictions for courses finished since the given instant
    ///
    /// Returns how many evaluations were newly written. Courses without a
    /// prediction or without recorded results are skipped and picked up on
    /// a later sweep.
    pub async fn evaluate_finished_courses(&self, since: NaiveDateTime) -> AppResult<usize> {
        let courses = self
            .course_repo
            .finished_since(since)
            .await
            .map_err(AppError::from)?;

        let mut evaluated = 0;
        for course in &courses {
            let already_scored = match self
                .prediction_repo
                .latest_for_course(course.id)
                .await
                .map_err(AppError::from)?
            {
                Some(prediction) => self
                    .prediction_repo
                    .evaluation_for(prediction.id)
                    .await
                    .map_err(AppError::from)?
                    .is_some(),
                None => continue,
            };
            if already_scored {
                continue;
            }

            if self.evaluate_course(course.id).await?.is_some() {
                evaluated += 1;
            }
        }

        Ok(evaluated)
    }

    /// Winner accuracy over the trailing window
    pub async fn accuracy(&self, window_days: i64) -> AppResult<AccuracyStats> {
        let window_days = window_days.clamp(1, 365);
        let since = Utc::now().naive_utc() - Duration::days(window_days);

        let (evaluated, winner_hits) = self
            .prediction_repo
            .accuracy_since(since)
            .await
            .map_err(AppError::from)?;

        let winner_hit_rate = if evaluated > 0 {
            winner_hits as f64 / evaluated as f64
        } else {
            0.0
        };

        Ok(AccuracyStats {
            window_days,
            evaluated,
            winner_hits,
            winner_hit_rate,
        })
    }

    async fn current_level(&self, user_id: Uuid) -> AppResult<SubscriptionLevel> {
        // Re-read from the database rather than trusting the JWT claim,
        // so an upgrade takes effect before the access token rotates.
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        Ok(user.level())
    }
}

/// Fetch the field, call the model service and store the result
pub(crate) async fn generate_prediction(
    course_repo: &CourseRepository,
    prediction_repo: &PredictionRepository,
    model_client: &ModelClient,
    course_id: Uuid,
) -> AppResult<Prediction> {
    let course = course_repo
        .find_by_id(course_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let participations = course_repo
        .participations_for_course(course_id)
        .await
        .map_err(AppError::from)?;
    if participations.is_empty() {
        return Err(AppError::BusinessLogic(
            "Course has no runners yet".to_string(),
        ));
    }

    let response = model_client.predict(&course, &participations).await?;

    let ranking = serde_json::to_value(&response.ranking)?;
    let confidence = response.confidence.and_then(Decimal::from_f64_retain);

    prediction_repo
        .create(course_id, &response.model_version, &ranking, confidence)
        .await
        .map_err(AppError::from)
}

fn view_for_level(prediction: Prediction, level: SubscriptionLevel) -> AppResult<PredictionView> {
    let total = prediction.runners()?.len();

    let (ranking, truncated) = if level == SubscriptionLevel::Free && total > FREE_RANKING_LIMIT {
        (prediction.truncated_ranking(FREE_RANKING_LIMIT)?, true)
    } else {
        (prediction.ranking.clone(), false)
    };

    Ok(PredictionView {
        id: prediction.id,
        course_id: prediction.course_id,
        model_version: prediction.model_version,
        ranking,
        confidence: prediction.confidence,
        truncated,
        created_at: prediction.created_at,
    })
}

/// Spearman rank correlation over the runners present in both orderings
///
/// Returns `None` when fewer than two runners are comparable, which happens
/// when most of the field did not finish.
fn spearman(predicted: &[i32], actual: &[i32]) -> Option<f64> {
    let in_actual: HashMap<i32, ()> = actual.iter().map(|n| (*n, ())).collect();
    let common_predicted: Vec<i32> = predicted
        .iter()
        .copied()
        .filter(|n| in_actual.contains_key(n))
        .collect();

    let predicted_rank: HashMap<i32, usize> = common_predicted
        .iter()
        .enumerate()
        .map(|(i, n)| (*n, i))
        .collect();
    let common_actual: Vec<i32> = actual
        .iter()
        .copied()
        .filter(|n| predicted_rank.contains_key(n))
        .collect();

    let n = common_actual.len();
    if n < 2 {
        return None;
    }

    let sum_d2: f64 = common_actual
        .iter()
        .enumerate()
        .map(|(actual_pos, numero)| {
            let predicted_pos = predicted_rank[numero];
            let d = predicted_pos as f64 - actual_pos as f64;
            d * d
        })
        .sum();

    let n = n as f64;
    Some(1.0 - (6.0 * sum_d2) / (n * (n * n - 1.0)))
}
