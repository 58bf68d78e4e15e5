use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User comment attached to a course
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentaireCourse {
    pub id: Uuid,
    pub course_id: Uuid,
    /// None once the author account has been deleted
    pub user_id: Option<Uuid>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl CommentaireCourse {
    pub fn new(course_id: Uuid, user_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            user_id: Some(user_id),
            content,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Validate comment content before persisting
    pub fn validate(&self) -> Result<(), String> {
        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            return Err("Comment must not be empty".to_string());
        }
        if trimmed.len() > 2000 {
            return Err("Comment must not exceed 2000 characters".to_string());
        }
        Ok(())
    }
}

/// Comment joined with the author's display name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentaireDetail {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: NaiveDateTime,
}
