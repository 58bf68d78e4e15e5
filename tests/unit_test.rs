mod helpers;

use chrono::{Duration, Utc};
use helpers::*;
use rust_decimal::Decimal;
use turf_backend::auth;
use turf_backend::error::AppError;
use turf_backend::models::*;
use uuid::Uuid;

/// Unit tests for status and kind enums
#[test]
fn test_course_status_conversion() {
    assert_eq!(CourseStatus::Scheduled.as_str(), "scheduled");
    assert_eq!(CourseStatus::from_str("running"), Some(CourseStatus::Running));
    assert_eq!(CourseStatus::from_str("finished"), Some(CourseStatus::Finished));
    assert_eq!(CourseStatus::from_str("postponed"), None);
}

#[test]
fn test_simulation_type_conversion() {
    assert_eq!(SimulationType::from_str("standard"), Some(SimulationType::Standard));
    assert_eq!(SimulationType::from_str("animation"), Some(SimulationType::Animation));
    assert_eq!(SimulationType::from_str("quantum"), None);
    assert_eq!(SimulationType::Comparison.as_str(), "comparison");
}

#[test]
fn test_notification_kind_conversion() {
    assert_eq!(NotificationKind::CourseReminder.as_str(), "course_reminder");
    assert_eq!(
        NotificationKind::from_str("prediction_alert"),
        Some(NotificationKind::PredictionAlert)
    );
    assert_eq!(NotificationKind::from_str("spam"), None);
}

#[test]
fn test_subscription_level_conversion() {
    assert_eq!(SubscriptionLevel::from_str("premium"), Some(SubscriptionLevel::Premium));
    assert_eq!(SubscriptionLevel::from_str("gold"), None);
    assert_eq!(SubscriptionLevel::Free.as_str(), "free");
}

/// Unit tests for promotion codes
#[test]
fn test_promotion_validity_window() {
    let now = Utc::now().naive_utc();
    let mut promo = PromotionCode {
        id: Uuid::new_v4(),
        code: "TURF20".to_string(),
        discount_percent: 20,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        max_uses: 10,
        use_count: 0,
        active: true,
    };

    assert!(promo.is_valid(now));
    assert!(!promo.is_valid(now - Duration::days(2)));
    assert!(!promo.is_valid(now + Duration::days(2)));

    promo.use_count = 10;
    assert!(!promo.is_valid(now));

    // Zero max_uses means unlimited redemptions
    promo.max_uses = 0;
    assert!(promo.is_valid(now));

    promo.active = false;
    assert!(!promo.is_valid(now));
}

#[test]
fn test_promotion_discount_application() {
    let now = Utc::now().naive_utc();
    let mut promo = PromotionCode {
        id: Uuid::new_v4(),
        code: "TURF20".to_string(),
        discount_percent: 20,
        valid_from: now,
        valid_until: now + Duration::days(1),
        max_uses: 0,
        use_count: 0,
        active: true,
    };

    assert_eq!(promo.apply(Decimal::new(990, 2)), Decimal::new(792, 2));

    promo.discount_percent = 100;
    assert_eq!(promo.apply(Decimal::new(990, 2)), Decimal::ZERO);

    promo.discount_percent = 150;
    assert_eq!(promo.apply(Decimal::new(990, 2)), Decimal::ZERO);
}

/// Unit tests for subscription periods
#[test]
fn test_subscription_active_window() {
    let now = Utc::now().naive_utc();
    let mut subscription = UserSubscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        plan_code: "premium".to_string(),
        status: "active".to_string(),
        start_date: now - Duration::days(5),
        end_date: now + Duration::days(25),
        auto_renew: false,
        created_at: now,
    };

    assert!(subscription.is_active(now));
    assert_eq!(subscription.status(), Some(SubscriptionStatus::Active));

    subscription.end_date = now - Duration::hours(1);
    assert!(!subscription.is_active(now));

    subscription.end_date = now + Duration::days(25);
    subscription.status = "cancelled".to_string();
    assert!(!subscription.is_active(now));
}

/// Unit tests for API keys
#[test]
fn test_api_key_usability() {
    let now = Utc::now().naive_utc();
    let mut key = ApiKey {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        label: "ci".to_string(),
        key_hash: "a".repeat(64),
        prefix: "trf_0000".to_string(),
        active: true,
        expires_at: None,
        last_used_at: None,
        created_at: now,
    };

    assert!(!key.is_expired(now));
    assert!(key.is_usable(now));

    key.expires_at = Some(now - Duration::minutes(1));
    assert!(key.is_expired(now));
    assert!(!key.is_usable(now));

    key.expires_at = Some(now + Duration::days(30));
    key.active = false;
    assert!(!key.is_usable(now));
}

/// Unit tests for notification preferences
#[test]
fn test_notification_defaults_and_filtering() {
    let settings = NotificationSettings::defaults(Uuid::new_v4());

    assert!(settings.email_enabled);
    assert!(settings.push_enabled);
    assert!(!settings.promotional);

    assert!(settings.allows(NotificationKind::System));
    assert!(settings.allows(NotificationKind::CourseReminder));
    assert!(!settings.allows(NotificationKind::Promotional));

    let mut muted = settings.clone();
    muted.course_reminders = false;
    assert!(!muted.allows(NotificationKind::CourseReminder));
    // System notices cannot be muted
    assert!(muted.allows(NotificationKind::System));
}

/// Unit tests for prediction rankings
#[test]
fn test_prediction_ranking_order() {
    let ranking = serde_json::json!([
        {"numero": 7, "cheval_id": Uuid::new_v4(), "probability": 0.31},
        {"numero": 2, "cheval_id": Uuid::new_v4(), "probability": 0.24},
        {"numero": 5, "cheval_id": Uuid::new_v4(), "probability": 0.18},
        {"numero": 1, "cheval_id": Uuid::new_v4(), "probability": 0.11},
    ]);
    let prediction = Prediction::new(Uuid::new_v4(), "model-3".to_string(), ranking, None);

    let runners = prediction.runners().unwrap();
    assert_eq!(runners.len(), 4);
    assert_eq!(runners[0].numero, 7);
    assert!(runners[0].probability > runners[3].probability);

    let podium = prediction.truncated_ranking(3).unwrap();
    let podium: Vec<RankedRunner> = serde_json::from_value(podium).unwrap();
    assert_eq!(podium.len(), 3);
    assert_eq!(podium[2].numero, 5);
}

#[test]
fn test_evaluation_scoring() {
    // Exact podium in order
    let (winner, podium) = PredictionEvaluation::score(&[7, 2, 5, 1], &[7, 2, 5, 1]);
    assert!(winner);
    assert_eq!(podium, 3);

    // Podium horses right, order wrong
    let (winner, podium) = PredictionEvaluation::score(&[7, 2, 5], &[5, 7, 2]);
    assert!(!winner);
    assert_eq!(podium, 3);

    // One podium hit
    let (winner, podium) = PredictionEvaluation::score(&[7, 2, 5], &[2, 9, 4]);
    assert!(!winner);
    assert_eq!(podium, 1);

    let (winner, podium) = PredictionEvaluation::score(&[], &[1, 2, 3]);
    assert!(!winner);
    assert_eq!(podium, 0);
}

/// Unit tests for model validation
#[test]
fn test_simulation_validation() {
    let valid = Simulation::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        SimulationType::Standard,
        Some("Heavy rain".to_string()),
        serde_json::json!({"weather": "rain"}),
    );
    assert!(valid.validate().is_ok());
    assert_eq!(valid.simulation_type(), Some(SimulationType::Standard));

    let mut bad_type = valid.clone();
    bad_type.simulation_type = "quantum".to_string();
    assert!(bad_type.validate().is_err());

    let mut bad_params = valid;
    bad_params.parameters = serde_json::json!([1, 2, 3]);
    assert!(bad_params.validate().is_err());
}

#[test]
fn test_course_validation() {
    let mut course = Course::new(
        Some("ZET-2026-042".to_string()),
        "Prix de Test".to_string(),
        "Vincennes".to_string(),
        Utc::now().naive_utc() + Duration::days(1),
        2700,
        "trot".to_string(),
    );

    assert!(course.validate().is_ok());
    assert!(course.is_open());

    course.status = CourseStatus::Finished.as_str().to_string();
    assert!(!course.is_open());

    course.distance_m = 0;
    assert!(course.validate().is_err());
}

/// Unit tests for request windows
#[test]
fn test_upcoming_window_clamping() {
    use turf_backend::services::course_service::clamp_days;

    assert_eq!(clamp_days(None), 1);
    assert_eq!(clamp_days(Some(3)), 3);
    assert_eq!(clamp_days(Some(7)), 7);
    assert_eq!(clamp_days(Some(30)), 7);
    assert_eq!(clamp_days(Some(0)), 1);
    assert_eq!(clamp_days(Some(-5)), 1);
}

/// Unit tests for error mapping
#[test]
fn test_repository_error_mapping() {
    use turf_backend::error::RepositoryError;

    let err = AppError::from(RepositoryError::NotFound("Course not found".to_string()));
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);

    let err = AppError::from(RepositoryError::Duplicate("users_email_key".to_string()));
    assert_eq!(err.status_code(), 400);

    let err = AppError::from(RepositoryError::BusinessRule(
        "Promotion code is no longer redeemable".to_string(),
    ));
    assert_eq!(err.status_code(), 400);
}

/// Unit tests for credential handling
#[test]
fn test_fixture_password_is_accepted() {
    assert!(auth::validate_password_strength(TEST_PASSWORD).is_ok());
    assert!(auth::validate_password_strength("short").is_err());
}

#[test]
fn test_api_key_secret_shape() {
    let (secret, prefix, hash) = auth::generate_api_key();

    assert!(secret.starts_with("trf_"));
    assert_eq!(prefix, &secret[..8]);
    assert_eq!(hash, auth::hash_api_key(&secret));
}
