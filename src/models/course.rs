use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Course lifecycle status matching the values stored in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Scheduled,
    Running,
    Finished,
    Cancelled,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Scheduled => "scheduled",
            CourseStatus::Running => "running",
            CourseStatus::Finished => "finished",
            CourseStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(CourseStatus::Scheduled),
            "running" => Some(CourseStatus::Running),
            "finished" => Some(CourseStatus::Finished),
            "cancelled" => Some(CourseStatus::Cancelled),
            _ => None,
        }
    }
}

/// Course model representing a single race at a hippodrome
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    /// Identifier of the race in the upstream data feed
    pub external_ref: Option<String>,
    pub name: String,
    pub hippodrome: String,
    pub race_date: NaiveDateTime,
    pub distance_m: i32,
    pub discipline: String,
    pub field_size: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Course {
    /// Create a new Course (typically from the upstream feed)
    pub fn new(
        external_ref: Option<String>,
        name: String,
        hippodrome: String,
        race_date: NaiveDateTime,
        distance_m: i32,
        discipline: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            external_ref,
            name,
            hippodrome,
            race_date,
            distance_m,
            discipline,
            field_size: 0,
            status: CourseStatus::Scheduled.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Typed view of the stored status string
    pub fn status(&self) -> Option<CourseStatus> {
        CourseStatus::from_str(&self.status)
    }

    /// A race accepts predictions and simulations until it has started
    pub fn is_open(&self) -> bool {
        matches!(self.status(), Some(CourseStatus::Scheduled))
    }

    /// Validate course fields before persisting
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Course name must not be empty".to_string());
        }
        if self.hippodrome.trim().is_empty() {
            return Err("Hippodrome must not be empty".to_string());
        }
        if self.distance_m <= 0 {
            return Err("Distance must be greater than zero".to_string());
        }
        Ok(())
    }
}
