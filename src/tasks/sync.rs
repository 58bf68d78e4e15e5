use crate::clients::{FeedClient, FeedCourse};
use crate::error::{AppError, AppResult};
use crate::models::{Course, CourseStatus, Notification, NotificationKind};
use crate::repositories::{CourseRepository, NotificationRepository, SimulationRepository};
use crate::tasks::TaskRegistry;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// How many days of programme to pull on each pass
const PROGRAMME_HORIZON_DAYS: i64 = 7;

/// Pulls the upstream race programme and refreshes courses, runners and odds
///
/// Each pass upserts everything the feed returns for the next week, so a
/// course that changes name, post time or status converges on the next tick.
/// Users who simulated a course get a reminder when it goes off.
pub struct OddsSyncTask {
    course_repo: Arc<CourseRepository>,
    simulation_repo: Arc<SimulationRepository>,
    notification_repo: Arc<NotificationRepository>,
    feed_client: Arc<FeedClient>,
    registry: Arc<TaskRegistry>,
    interval: Duration,
}

impl OddsSyncTask {
    pub fn new(
        course_repo: Arc<CourseRepository>,
        simulation_repo: Arc<SimulationRepository>,
        notification_repo: Arc<NotificationRepository>,
        feed_client: Arc<FeedClient>,
        registry: Arc<TaskRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            course_repo,
            simulation_repo,
            notification_repo,
            feed_client,
            registry,
            interval,
        }
    }

    /// Run the sync loop until the process exits
    pub async fn start(self) {
        if !self.feed_client.is_active() {
            info!("odds sync disabled, no data feed configured");
            return;
        }

        let mut interval = time::interval(self.interval);
        info!("odds sync started, polling every {:?}", self.interval);

        loop {
            interval.tick().await;

            let task_id = self.registry.enqueue("odds_sync", None).await;
            self.registry.mark_running(task_id).await;
            match self.sync_programme().await {
                Ok(summary) => {
                    self.registry.mark_succeeded(task_id, Some(summary)).await;
                }
                Err(e) => {
                    error!("odds sync failed: {}", e);
                    self.registry.mark_failed(task_id, &e.to_string()).await;
                }
            }
        }
    }

    /// One full pass over the upcoming programme
    async fn sync_programme(&self) -> AppResult<serde_json::Value> {
        let today = Utc::now().date_naive();
        let horizon = today + chrono::Duration::days(PROGRAMME_HORIZON_DAYS);

        let programme = self.feed_client.programme(today, horizon).await?;

        let mut courses = 0usize;
        let mut odds_updates = 0usize;
        for feed_course in &programme {
            match self.sync_course(feed_course).await {
                Ok(updates) => {
                    courses += 1;
                    odds_updates += updates;
                }
                Err(e) => {
                    // One broken course must not sink the rest of the pass
                    warn!(
                        external_ref = %feed_course.external_ref,
                        error = %e,
                        "course sync failed"
                    );
                }
            }
        }

        info!(courses, odds_updates, "odds sync pass finished");
        Ok(json!({ "courses": courses, "odds_updates": odds_updates }))
    }

    /// Upsert one course with its field, returning how many odds changed
    async fn sync_course(&self, feed_course: &FeedCourse) -> AppResult<usize> {
        let previous = self
            .course_repo
            .find_by_external_ref(&feed_course.external_ref)
            .await
            .map_err(AppError::from)?;

        let course = self
            .course_repo
            .upsert_by_external_ref(
                &feed_course.external_ref,
                &feed_course.name,
                &feed_course.hippodrome,
                feed_course.race_date,
                feed_course.distance_m,
                &feed_course.discipline,
                &feed_course.status,
            )
            .await
            .map_err(AppError::from)?;

        let mut odds_updates = 0usize;
        for runner in &feed_course.runners {
            let cheval = self
                .course_repo
                .upsert_cheval(&runner.cheval, runner.age, runner.sex.as_deref())
                .await
                .map_err(AppError::from)?;

            let jockey_id = match runner.jockey.as_deref() {
                Some(name) => Some(
                    self.course_repo
                        .upsert_jockey(name)
                        .await
                        .map_err(AppError::from)?
                        .id,
                ),
                None => None,
            };

            let participation = self
                .course_repo
                .upsert_participation(course.id, cheval.id, jockey_id, runner.numero, runner.weight_kg)
                .await
                .map_err(AppError::from)?;

            // Only write history when the quote actually moved
            if let Some(odds) = runner.odds {
                if participation.current_odds != Some(odds) {
                    self.course_repo
                        .record_odds(participation.id, odds)
                        .await
                        .map_err(AppError::from)?;
                    odds_updates += 1;
                }
            }

            if let Some(position) = runner.final_position {
                self.course_repo
                    .record_final_position(course.id, runner.numero, position)
                    .await
                    .map_err(AppError::from)?;
            }
        }

        let went_off = previous
            .map(|p| p.status != course.status)
            .unwrap_or(false)
            && course.status == CourseStatus::Running.as_str();
        if went_off {
            self.notify_course_start(&course).await;
        }

        Ok(odds_updates)
    }

    /// Queue a reminder for everyone who simulated this course
    async fn notify_course_start(&self, course: &Course) {
        let user_ids = match self.simulation_repo.user_ids_for_course(course.id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(course_id = %course.id, error = %e, "could not load users to remind");
                return;
            }
        };

        for user_id in user_ids {
            let notification = Notification::new(
                user_id,
                "Départ imminent".to_string(),
                format!("La course {} s'élance", course.name),
                NotificationKind::CourseReminder,
                Some(json!({ "course_id": course.id })),
            );
            if let Err(e) = self.notification_repo.create(&notification).await {
                warn!(user_id = %user_id, error = %e, "failed to store course reminder");
            }
        }

        info!(course_id = %course.id, name = %course.name, "course start reminders queued");
    }
}
