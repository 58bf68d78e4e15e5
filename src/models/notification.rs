use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Notification category; settings let users opt out per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    System,
    CourseReminder,
    PredictionAlert,
    Promotional,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::System => "system",
            NotificationKind::CourseReminder => "course_reminder",
            NotificationKind::PredictionAlert => "prediction_alert",
            NotificationKind::Promotional => "promotional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "system" => Some(NotificationKind::System),
            "course_reminder" => Some(NotificationKind::CourseReminder),
            "prediction_alert" => Some(NotificationKind::PredictionAlert),
            "promotional" => Some(NotificationKind::Promotional),
            _ => None,
        }
    }
}

/// Stored notification; `sent` tracks delivery through push/email
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub data: Option<serde_json::Value>, // JSONB in database
    pub read: bool,
    pub sent: bool,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        title: String,
        body: String,
        kind: NotificationKind,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            body,
            kind: kind.as_str().to_string(),
            data,
            read: false,
            sent: false,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Typed view of the stored kind string
    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::from_str(&self.kind)
    }
}

/// Per-user delivery preferences, one row per user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub course_reminders: bool,
    pub prediction_alerts: bool,
    pub promotional: bool,
    pub updated_at: NaiveDateTime,
}

impl NotificationSettings {
    /// Default settings applied when a user has never saved any
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_enabled: true,
            push_enabled: true,
            course_reminders: true,
            prediction_alerts: true,
            promotional: false,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Whether a notification of the given kind may be delivered at all
    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::System => true,
            NotificationKind::CourseReminder => self.course_reminders,
            NotificationKind::PredictionAlert => self.prediction_alerts,
            NotificationKind::Promotional => self.promotional,
        }
    }
}

/// Registered push target for one device
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDevice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_token: String,
    pub platform: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub last_seen_at: Option<NaiveDateTime>,
}
