use crate::error::{AppError, AppResult};
use crate::models::{CommentaireCourse, CommentaireDetail, Course, CoteHistorique, ParticipationDetail};
use crate::repositories::CourseRepository;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Default and maximum window for the upcoming race list, in days
const DEFAULT_UPCOMING_DAYS: i64 = 1;
const MAX_UPCOMING_DAYS: i64 = 7;

/// A course together with its runners
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub participations: Vec<ParticipationDetail>,
}

/// Read access to races, runners, odds history and comments
pub struct CourseService {
    course_repo: Arc<CourseRepository>,
}

impl CourseService {
    pub fn new(course_repo: Arc<CourseRepository>) -> Self {
        Self { course_repo }
    }

    /// Scheduled courses over the next `days` days
    pub async fn upcoming(&self, days: Option<i64>) -> AppResult<Vec<Course>> {
        let days = clamp_days(days);
        let from = Utc::now().naive_utc();
        let to = from + Duration::days(days);

        self.course_repo
            .upcoming(from, to)
            .await
            .map_err(AppError::from)
    }

    pub async fn detail(&self, course_id: uuid::Uuid) -> AppResult<CourseDetail> {
        let course = self
            .course_repo
            .find_by_id(course_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let participations = self
            .course_repo
            .participations_for_course(course_id)
            .await
            .map_err(AppError::from)?;

        Ok(CourseDetail {
            course,
            participations,
        })
    }

    pub async fn participations(&self, course_id: uuid::Uuid) -> AppResult<Vec<ParticipationDetail>> {
        self.require_course(course_id).await?;

        self.course_repo
            .participations_for_course(course_id)
            .await
            .map_err(AppError::from)
    }

    /// Odds snapshots for one runner, oldest first
    pub async fn cotes_for_participation(
        &self,
        participation_id: uuid::Uuid,
    ) -> AppResult<Vec<CoteHistorique>> {
        let cotes = self
            .course_repo
            .cotes_for_participation(participation_id)
            .await
            .map_err(AppError::from)?;

        // The odds table cannot distinguish an unknown runner from one
        // without snapshots, so check the runner itself.
        if cotes.is_empty() {
            self.course_repo
                .participation_exists(participation_id)
                .await
                .map_err(AppError::from)?
                .then_some(())
                .ok_or_else(|| AppError::NotFound("Participation not found".to_string()))?;
        }

        Ok(cotes)
    }

    pub async fn commentaires(&self, course_id: uuid::Uuid) -> AppResult<Vec<CommentaireDetail>> {
        self.require_course(course_id).await?;

        self.course_repo
            .commentaires_for_course(course_id)
            .await
            .map_err(AppError::from)
    }

    pub async fn add_commentaire(
        &self,
        course_id: uuid::Uuid,
        user_id: uuid::Uuid,
        content: &str,
    ) -> AppResult<CommentaireDetail> {
        self.require_course(course_id).await?;

        let commentaire = CommentaireCourse::new(course_id, user_id, content.to_string());
        commentaire.validate().map_err(AppError::Validation)?;

        let created = self
            .course_repo
            .insert_commentaire(course_id, user_id, &commentaire.content)
            .await
            .map_err(AppError::from)?;

        info!(course_id = %course_id, user_id = %user_id, "comment posted");
        Ok(created)
    }

    async fn require_course(&self, course_id: uuid::Uuid) -> AppResult<Course> {
        self.course_repo
            .find_by_id(course_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
    }
}

/// Clamp the requested window to the supported range
pub fn clamp_days(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_UPCOMING_DAYS)
        .clamp(1, MAX_UPCOMING_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_days_default() {
        assert_eq!(clamp_days(None), DEFAULT_UPCOMING_DAYS);
    }

    #[test]
    fn test_clamp_days_caps_at_one_week() {
        assert_eq!(clamp_days(Some(30)), MAX_UPCOMING_DAYS);
        assert_eq!(clamp_days(Some(7)), 7);
    }

    #[test]
    fn test_clamp_days_floors_at_one() {
        assert_eq!(clamp_days(Some(0)), 1);
        assert_eq!(clamp_days(Some(-5)), 1);
    }
}
