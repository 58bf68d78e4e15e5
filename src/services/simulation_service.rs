use crate::clients::ModelClient;
use crate::error::{AppError, AppResult};
use crate::models::{Simulation, SimulationType, SubscriptionLevel};
use crate::repositories::{CourseRepository, SimulationRepository, UserRepository};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Simulations per calendar day by tier; premium is uncapped
const FREE_DAILY_SIMULATIONS: i32 = 3;
const STANDARD_DAILY_SIMULATIONS: i32 = 25;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Today's quota standing for one user
#[derive(Debug, Clone, Serialize)]
pub struct QuotaView {
    pub used_today: i32,
    /// `None` means unlimited
    pub daily_limit: Option<i32>,
    pub remaining: Option<i32>,
}

/// Running and managing what-if simulations
pub struct SimulationService {
    simulation_repo: Arc<SimulationRepository>,
    course_repo: Arc<CourseRepository>,
    user_repo: Arc<UserRepository>,
    model_client: Arc<ModelClient>,
}

impl SimulationService {
    pub fn new(
        simulation_repo: Arc<SimulationRepository>,
        course_repo: Arc<CourseRepository>,
        user_repo: Arc<UserRepository>,
        model_client: Arc<ModelClient>,
    ) -> Self {
        Self {
            simulation_repo,
            course_repo,
            user_repo,
            model_client,
        }
    }

    /// Run a simulation against the model service and store the outcome
    pub async fn create(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        simulation_type: SimulationType,
        title: Option<String>,
        parameters: serde_json::Value,
    ) -> AppResult<Simulation> {
        let level = self.current_level(user_id).await?;

        if simulation_type == SimulationType::Animation && level != SubscriptionLevel::Premium {
            return Err(AppError::Forbidden(
                "Animation simulations require a premium subscription".to_string(),
            ));
        }

        let course = self
            .course_repo
            .find_by_id(course_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let mut simulation = Simulation::new(user_id, course_id, simulation_type, title, parameters);
        simulation.validate().map_err(AppError::Validation)?;

        // Take the quota unit before calling the model, so concurrent
        // requests cannot slip past the cap.
        self.consume_quota(user_id, level).await?;

        let results = self
            .model_client
            .simulate(&course, simulation_type.as_str(), &simulation.parameters)
            .await?;
        simulation.results = Some(results);

        let created = self
            .simulation_repo
            .create(&simulation)
            .await
            .map_err(AppError::from)?;

        info!(
            user_id = %user_id,
            course_id = %course_id,
            simulation_id = %created.id,
            kind = simulation_type.as_str(),
            "simulation stored"
        );
        Ok(created)
    }

    pub async fn get(&self, user_id: Uuid, simulation_id: Uuid) -> AppResult<Simulation> {
        let simulation = self
            .simulation_repo
            .find_by_id(simulation_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Simulation not found".to_string()))?;

        if simulation.user_id != user_id {
            return Err(AppError::Forbidden(
                "Simulation belongs to another user".to_string(),
            ));
        }

        Ok(simulation)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<Simulation>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);

        self.simulation_repo
            .list_for_user(user_id, limit, offset)
            .await
            .map_err(AppError::from)
    }

    pub async fn delete(&self, user_id: Uuid, simulation_id: Uuid) -> AppResult<()> {
        let deleted = self
            .simulation_repo
            .delete(simulation_id, user_id)
            .await
            .map_err(AppError::from)?;
        if !deleted {
            return Err(AppError::NotFound("Simulation not found".to_string()));
        }

        info!(user_id = %user_id, simulation_id = %simulation_id, "simulation deleted");
        Ok(())
    }

    /// Current standing against today's quota
    pub async fn quota(&self, user_id: Uuid) -> AppResult<QuotaView> {
        let level = self.current_level(user_id).await?;
        let today = Utc::now().date_naive();

        let used_today = self
            .simulation_repo
            .usage_for(user_id, today)
            .await
            .map_err(AppError::from)?
            .map(|u| u.count)
            .unwrap_or(0);

        let daily_limit = daily_limit(level);
        let remaining = daily_limit.map(|limit| (limit - used_today).max(0));

        Ok(QuotaView {
            used_today,
            daily_limit,
            remaining,
        })
    }

    async fn consume_quota(&self, user_id: Uuid, level: SubscriptionLevel) -> AppResult<()> {
        let today = Utc::now().date_naive();

        match daily_limit(level) {
            Some(limit) => {
                let taken = self
                    .simulation_repo
                    .try_consume_quota(user_id, today, limit)
                    .await
                    .map_err(AppError::from)?;
                if taken.is_none() {
                    return Err(AppError::Forbidden(format!(
                        "Daily simulation quota of {} reached",
                        limit
                    )));
                }
            }
            None => {
                self.simulation_repo
                    .record_usage(user_id, today)
                    .await
                    .map_err(AppError::from)?;
            }
        }
        Ok(())
    }

    async fn current_level(&self, user_id: Uuid) -> AppResult<SubscriptionLevel> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        Ok(user.level())
    }
}

/// Per-day cap for a tier; `None` means unlimited
pub fn daily_limit(level: SubscriptionLevel) -> Option<i32> {
    match level {
        SubscriptionLevel::Free => Some(FREE_DAILY_SIMULATIONS),
        SubscriptionLevel::Standard => Some(STANDARD_DAILY_SIMULATIONS),
        SubscriptionLevel::Premium => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_limits_by_tier() {
        assert_eq!(daily_limit(SubscriptionLevel::Free), Some(3));
        assert_eq!(daily_limit(SubscriptionLevel::Standard), Some(25));
        assert_eq!(daily_limit(SubscriptionLevel::Premium), None);
    }
}
