use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationKind};
use crate::repositories::{
    NotificationRepository, SimulationRepository, SubscriptionRepository, TokenRepository,
    UserRepository,
};
use crate::tasks::TaskRegistry;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// How long read notifications and quota counters are kept, in days
const RETENTION_DAYS: i64 = 30;

/// Periodic housekeeping over tokens, notifications, quotas and subscriptions
///
/// Expired subscriptions are the one piece with user-visible effect: the
/// account drops back to the free tier and gets told about it.
pub struct CleanupTask {
    token_repo: Arc<TokenRepository>,
    notification_repo: Arc<NotificationRepository>,
    simulation_repo: Arc<SimulationRepository>,
    subscription_repo: Arc<SubscriptionRepository>,
    user_repo: Arc<UserRepository>,
    registry: Arc<TaskRegistry>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(
        token_repo: Arc<TokenRepository>,
        notification_repo: Arc<NotificationRepository>,
        simulation_repo: Arc<SimulationRepository>,
        subscription_repo: Arc<SubscriptionRepository>,
        user_repo: Arc<UserRepository>,
        registry: Arc<TaskRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            token_repo,
            notification_repo,
            simulation_repo,
            subscription_repo,
            user_repo,
            registry,
            interval,
        }
    }

    /// Run the cleanup loop until the process exits
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!("cleanup started, sweeping every {:?}", self.interval);

        loop {
            interval.tick().await;

            let task_id = self.registry.enqueue("cleanup", None).await;
            self.registry.mark_running(task_id).await;
            match self.sweep().await {
                Ok(summary) => {
                    self.registry.mark_succeeded(task_id, Some(summary)).await;
                }
                Err(e) => {
                    error!("cleanup failed: {}", e);
                    self.registry.mark_failed(task_id, &e.to_string()).await;
                }
            }
        }
    }

    /// One housekeeping pass
    async fn sweep(&self) -> AppResult<serde_json::Value> {
        let now = Utc::now().naive_utc();
        let cutoff = now - chrono::Duration::days(RETENTION_DAYS);

        let tokens = self
            .token_repo
            .delete_stale(now)
            .await
            .map_err(AppError::from)?;

        let notifications = self
            .notification_repo
            .delete_read_before(cutoff)
            .await
            .map_err(AppError::from)?;

        let quotas = self
            .simulation_repo
            .delete_usage_before(cutoff.date())
            .await
            .map_err(AppError::from)?;

        let expired = self.expire_subscriptions(now).await?;

        info!(
            tokens,
            notifications, quotas, expired, "cleanup pass finished"
        );
        Ok(json!({
            "tokens": tokens,
            "notifications": notifications,
            "quotas": quotas,
            "expired_subscriptions": expired,
        }))
    }

    /// Expire overdue subscriptions and downgrade the affected accounts
    async fn expire_subscriptions(&self, now: chrono::NaiveDateTime) -> AppResult<usize> {
        let user_ids = self
            .subscription_repo
            .expire_overdue(now)
            .await
            .map_err(AppError::from)?;
        if user_ids.is_empty() {
            return Ok(0);
        }

        self.user_repo
            .downgrade_to_free(&user_ids)
            .await
            .map_err(AppError::from)?;

        for user_id in &user_ids {
            let notification = Notification::new(
                *user_id,
                "Abonnement expiré".to_string(),
                "Votre abonnement est arrivé à échéance, votre compte repasse en formule gratuite"
                    .to_string(),
                NotificationKind::System,
                None,
            );
            if let Err(e) = self.notification_repo.create(&notification).await {
                warn!(user_id = %user_id, error = %e, "failed to store expiry notification");
            }
        }

        info!(count = user_ids.len(), "expired subscriptions downgraded");
        Ok(user_ids.len())
    }
}
