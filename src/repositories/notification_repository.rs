use crate::models::{Notification, NotificationSettings, UserDevice};
use chrono::NaiveDateTime;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for notifications, delivery settings and push devices
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new NotificationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification for later listing and dispatch
    pub async fn create(&self, notification: &Notification) -> SqlxResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, body, kind, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, body, kind, data, read, sent, created_at
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.kind)
        .bind(&notification.data)
        .fetch_one(&self.pool)
        .await
    }

    /// Notifications of one user, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> SqlxResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, body, kind, data, read, sent, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark one notification of the given user as read
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread notification of the user as read
    pub async fn mark_all_read(&self, user_id: Uuid) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE user_id = $1 AND read = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Oldest undelivered notifications, up to `limit`
    pub async fn unsent(&self, limit: i64) -> SqlxResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, body, kind, data, read, sent, created_at
            FROM notifications
            WHERE sent = FALSE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Flag a notification as delivered
    pub async fn mark_sent(&self, id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET sent = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop read notifications older than the cutoff
    pub async fn delete_read_before(&self, cutoff: NaiveDateTime) -> SqlxResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE read = TRUE AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Stored delivery settings, if the user ever saved any
    pub async fn settings_for(&self, user_id: Uuid) -> SqlxResult<Option<NotificationSettings>> {
        sqlx::query_as::<_, NotificationSettings>(
            r#"
            SELECT user_id, email_enabled, push_enabled, course_reminders,
                   prediction_alerts, promotional, updated_at
            FROM notification_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create or replace the user's delivery settings
    pub async fn upsert_settings(
        &self,
        settings: &NotificationSettings,
    ) -> SqlxResult<NotificationSettings> {
        sqlx::query_as::<_, NotificationSettings>(
            r#"
            INSERT INTO notification_settings
                (user_id, email_enabled, push_enabled, course_reminders, prediction_alerts, promotional)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET email_enabled = EXCLUDED.email_enabled,
                push_enabled = EXCLUDED.push_enabled,
                course_reminders = EXCLUDED.course_reminders,
                prediction_alerts = EXCLUDED.prediction_alerts,
                promotional = EXCLUDED.promotional,
                updated_at = NOW()
            RETURNING user_id, email_enabled, push_enabled, course_reminders,
                      prediction_alerts, promotional, updated_at
            "#,
        )
        .bind(settings.user_id)
        .bind(settings.email_enabled)
        .bind(settings.push_enabled)
        .bind(settings.course_reminders)
        .bind(settings.prediction_alerts)
        .bind(settings.promotional)
        .fetch_one(&self.pool)
        .await
    }

    /// Register a push device, reassigning the token if another account
    /// used it before
    pub async fn register_device(
        &self,
        user_id: Uuid,
        device_token: &str,
        platform: &str,
    ) -> SqlxResult<UserDevice> {
        sqlx::query_as::<_, UserDevice>(
            r#"
            INSERT INTO user_devices (user_id, device_token, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (device_token) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                platform = EXCLUDED.platform,
                active = TRUE,
                last_seen_at = NOW()
            RETURNING id, user_id, device_token, platform, active, created_at, last_seen_at
            "#,
        )
        .bind(user_id)
        .bind(device_token)
        .bind(platform)
        .fetch_one(&self.pool)
        .await
    }

    /// Deactivate one of the user's devices
    pub async fn deactivate_device(&self, user_id: Uuid, device_id: Uuid) -> SqlxResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_devices
            SET active = FALSE
            WHERE id = $2 AND user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active push targets of one user
    pub async fn active_devices_for(&self, user_id: Uuid) -> SqlxResult<Vec<UserDevice>> {
        sqlx::query_as::<_, UserDevice>(
            r#"
            SELECT id, user_id, device_token, platform, active, created_at, last_seen_at
            FROM user_devices
            WHERE user_id = $1 AND active = TRUE
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
