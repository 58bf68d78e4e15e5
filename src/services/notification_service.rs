use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationKind, NotificationSettings, UserDevice};
use crate::notifier::{EmailClient, PushClient};
use crate::repositories::{NotificationRepository, UserRepository};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

const SUPPORTED_PLATFORMS: [&str; 3] = ["ios", "android", "web"];

/// Partial update of delivery preferences; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub course_reminders: Option<bool>,
    pub prediction_alerts: Option<bool>,
    pub promotional: Option<bool>,
}

/// In-app notifications, delivery preferences and device registry
pub struct NotificationService {
    notification_repo: Arc<NotificationRepository>,
    user_repo: Arc<UserRepository>,
    email_client: Arc<EmailClient>,
    push_client: Arc<PushClient>,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<NotificationRepository>,
        user_repo: Arc<UserRepository>,
        email_client: Arc<EmailClient>,
        push_client: Arc<PushClient>,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            email_client,
            push_client,
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);

        self.notification_repo
            .list_for_user(user_id, unread_only, limit, offset)
            .await
            .map_err(AppError::from)
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let marked = self
            .notification_repo
            .mark_read(notification_id, user_id)
            .await
            .map_err(AppError::from)?;
        if !marked {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        self.notification_repo
            .mark_all_read(user_id)
            .await
            .map_err(AppError::from)
    }

    /// Stored preferences, or the defaults when never saved
    pub async fn settings(&self, user_id: Uuid) -> AppResult<NotificationSettings> {
        let settings = self
            .notification_repo
            .settings_for(user_id)
            .await
            .map_err(AppError::from)?
            .unwrap_or_else(|| NotificationSettings::defaults(user_id));

        Ok(settings)
    }

    pub async fn update_settings(
        &self,
        user_id: Uuid,
        patch: SettingsPatch,
    ) -> AppResult<NotificationSettings> {
        let mut settings = self.settings(user_id).await?;

        if let Some(v) = patch.email_enabled {
            settings.email_enabled = v;
        }
        if let Some(v) = patch.push_enabled {
            settings.push_enabled = v;
        }
        if let Some(v) = patch.course_reminders {
            settings.course_reminders = v;
        }
        if let Some(v) = patch.prediction_alerts {
            settings.prediction_alerts = v;
        }
        if let Some(v) = patch.promotional {
            settings.promotional = v;
        }

        let saved = self
            .notification_repo
            .upsert_settings(&settings)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user_id, "notification settings updated");
        Ok(saved)
    }

    pub async fn register_device(
        &self,
        user_id: Uuid,
        device_token: &str,
        platform: &str,
    ) -> AppResult<UserDevice> {
        let device_token = device_token.trim();
        if device_token.is_empty() || device_token.len() > 255 {
            return Err(AppError::Validation(
                "Device token must be between 1 and 255 characters".to_string(),
            ));
        }

        let platform = platform.trim().to_lowercase();
        if !SUPPORTED_PLATFORMS.contains(&platform.as_str()) {
            return Err(AppError::Validation(format!(
                "Unsupported platform: {}",
                platform
            )));
        }

        let device = self
            .notification_repo
            .register_device(user_id, device_token, &platform)
            .await
            .map_err(AppError::from)?;

        info!(user_id = %user_id, platform = %platform, "device registered");
        Ok(device)
    }

    pub async fn remove_device(&self, user_id: Uuid, device_id: Uuid) -> AppResult<()> {
        let removed = self
            .notification_repo
            .deactivate_device(user_id, device_id)
            .await
            .map_err(AppError::from)?;
        if !removed {
            return Err(AppError::NotFound("Device not found".to_string()));
        }
        Ok(())
    }

    /// Store a notification for later dispatch
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        body: String,
        data: Option<serde_json::Value>,
    ) -> AppResult<Notification> {
        let notification = Notification::new(user_id, title, body, kind, data);

        self.notification_repo
            .create(&notification)
            .await
            .map_err(AppError::from)
    }

    /// Deliver stored notifications through push and email
    ///
    /// Each notification gets exactly one delivery attempt and is then
    /// marked sent; transport failures are logged, not retried. The in-app
    /// copy stays available either way. Returns how many were processed.
    pub async fn dispatch_pending(&self, limit: i64) -> AppResult<usize> {
        let pending = self
            .notification_repo
            .unsent(limit)
            .await
            .map_err(AppError::from)?;

        let mut processed = 0usize;
        for notification in pending {
            self.deliver(&notification).await;

            self.notification_repo
                .mark_sent(notification.id)
                .await
                .map_err(AppError::from)?;
            processed += 1;
        }

        Ok(processed)
    }

    async fn deliver(&self, notification: &Notification) {
        let kind = notification.kind().unwrap_or(NotificationKind::System);

        let settings = match self.notification_repo.settings_for(notification.user_id).await {
            Ok(settings) => {
                settings.unwrap_or_else(|| NotificationSettings::defaults(notification.user_id))
            }
            Err(e) => {
                warn!(notification_id = %notification.id, error = %e, "failed to load settings");
                return;
            }
        };

        if !settings.allows(kind) {
            return;
        }

        if settings.push_enabled {
            self.deliver_push(notification).await;
        }

        // Prediction alerts are time-sensitive and go out as push only
        if settings.email_enabled && kind != NotificationKind::PredictionAlert {
            self.deliver_email(notification).await;
        }
    }

    async fn deliver_push(&self, notification: &Notification) {
        let devices = match self
            .notification_repo
            .active_devices_for(notification.user_id)
            .await
        {
            Ok(devices) => devices,
            Err(e) => {
                warn!(notification_id = %notification.id, error = %e, "failed to load devices");
                return;
            }
        };

        let tokens: Vec<String> = devices.into_iter().map(|d| d.device_token).collect();
        if tokens.is_empty() {
            return;
        }

        if let Err(e) = self
            .push_client
            .send(
                &tokens,
                &notification.title,
                &notification.body,
                notification.data.as_ref(),
            )
            .await
        {
            warn!(notification_id = %notification.id, error = %e, "push delivery failed");
        }
    }

    async fn deliver_email(&self, notification: &Notification) {
        let user = match self.user_repo.find_by_id(notification.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(notification_id = %notification.id, error = %e, "failed to load user");
                return;
            }
        };

        if let Err(e) = self
            .email_client
            .send(&user.email, &notification.title, &notification.body)
            .await
        {
            warn!(notification_id = %notification.id, error = %e, "email delivery failed");
        }
    }
}
