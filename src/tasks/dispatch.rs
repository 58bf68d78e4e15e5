use crate::services::NotificationService;
use crate::tasks::TaskRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// How many stored notifications one pass will push out
const DISPATCH_BATCH: i64 = 50;

/// Drains stored notifications through push and email
pub struct NotificationDispatchTask {
    notification_service: Arc<NotificationService>,
    registry: Arc<TaskRegistry>,
    interval: Duration,
}

impl NotificationDispatchTask {
    pub fn new(
        notification_service: Arc<NotificationService>,
        registry: Arc<TaskRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            notification_service,
            registry,
            interval,
        }
    }

    /// Run the dispatch loop until the process exits
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        info!(
            "notification dispatch started, draining every {:?}",
            self.interval
        );

        loop {
            interval.tick().await;

            let task_id = self.registry.enqueue("notification_dispatch", None).await;
            self.registry.mark_running(task_id).await;
            match self.notification_service.dispatch_pending(DISPATCH_BATCH).await {
                Ok(processed) => {
                    self.registry
                        .mark_succeeded(task_id, Some(json!({ "processed": processed })))
                        .await;
                }
                Err(e) => {
                    error!("notification dispatch failed: {}", e);
                    self.registry.mark_failed(task_id, &e.to_string()).await;
                }
            }
        }
    }
}
