//! Flows exercised the way the HTTP layer drives them, asserting the
//! status codes the API contract promises.
//!
//! Ignored by default; run with `cargo test -- --ignored` against a scratch
//! database (TEST_DATABASE_URL).

mod helpers;

use chrono::{Duration, Utc};
use helpers::*;
use std::sync::Arc;
use turf_backend::auth;
use turf_backend::clients::{IdentityClient, ModelClient};
use turf_backend::config::{AuthConfig, ProviderConfig};
use turf_backend::error::AppError;
use turf_backend::models::*;
use turf_backend::notifier::EmailClient;
use turf_backend::services::*;
use turf_backend::tasks::TaskRegistry;
use uuid::Uuid;

fn auth_service(db: &TestDatabase) -> AuthService {
    let providers = ProviderConfig::default();
    AuthService::new(
        Arc::clone(&db.user_repo),
        Arc::clone(&db.token_repo),
        Arc::new(EmailClient::new(&providers)),
        Arc::new(IdentityClient::new(&providers)),
        AuthConfig::default(),
    )
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_maps_to_400() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);

    auth.register("unique@example.com", TEST_PASSWORD, None)
        .await
        .expect("First registration should pass");

    // Same address with different case still collides
    let dup = auth
        .register("Unique@Example.com", TEST_PASSWORD, None)
        .await
        .expect_err("Duplicate registration should fail");
    assert_eq!(dup.status_code(), 400);
    assert!(dup.to_string().contains("already exists"));
}

#[tokio::test]
#[ignore]
async fn test_bad_credentials_map_to_401() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);
    create_test_user(&db, "present@example.com").await;

    let wrong_password = auth
        .login("present@example.com", "not the password")
        .await
        .expect_err("Wrong password should fail");
    assert_eq!(wrong_password.status_code(), 401);

    // Unknown accounts produce the same response as wrong passwords
    let unknown = auth
        .login("absent@example.com", TEST_PASSWORD)
        .await
        .expect_err("Unknown account should fail");
    assert_eq!(unknown.status_code(), 401);
    assert_eq!(unknown.to_string(), wrong_password.to_string());
}

#[tokio::test]
#[ignore]
async fn test_deactivated_account_maps_to_403() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);
    let users = UserService::new(Arc::clone(&db.user_repo), Arc::clone(&db.token_repo));

    let tokens = auth
        .register("leaving@example.com", TEST_PASSWORD, None)
        .await
        .expect("Failed to register");

    users
        .deactivate(tokens.user.id)
        .await
        .expect("Failed to deactivate");

    let login = auth
        .login("leaving@example.com", TEST_PASSWORD)
        .await
        .expect_err("Deactivated account should not log in");
    assert_eq!(login.status_code(), 403);

    // Existing sessions died with the account
    let refresh = auth
        .refresh(&tokens.refresh_token)
        .await
        .expect_err("Revoked session should not refresh");
    assert_eq!(refresh.status_code(), 401);
}

#[tokio::test]
#[ignore]
async fn test_password_change_revokes_other_sessions() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);
    let users = UserService::new(Arc::clone(&db.user_repo), Arc::clone(&db.token_repo));

    let session = auth
        .register("careful@example.com", TEST_PASSWORD, None)
        .await
        .expect("Failed to register");

    let wrong_current = users
        .change_password(session.user.id, "not the password", "replacement pass")
        .await
        .expect_err("Wrong current password should fail");
    assert_eq!(wrong_current.status_code(), 401);

    users
        .change_password(session.user.id, TEST_PASSWORD, "replacement pass")
        .await
        .expect("Failed to change password");

    let stale = auth
        .refresh(&session.refresh_token)
        .await
        .expect_err("Old session should be revoked");
    assert_eq!(stale.status_code(), 401);

    assert!(auth.login("careful@example.com", "replacement pass").await.is_ok());
}

#[tokio::test]
#[ignore]
async fn test_api_key_cap_maps_to_403() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let user = create_test_user(&db, "builder@example.com").await;
    let api_keys = ApiKeyService::new(Arc::clone(&db.api_key_repo), 2);

    let first = api_keys
        .create(user.id, "ci", None)
        .await
        .expect("First key should pass");
    api_keys
        .create(user.id, "staging", Some(30))
        .await
        .expect("Second key should pass");

    let over_cap = api_keys
        .create(user.id, "prod", None)
        .await
        .expect_err("Third key should hit the cap");
    assert_eq!(over_cap.status_code(), 403);

    // Deactivating frees a slot; the cap counts active keys only
    api_keys
        .deactivate(user.id, first.key.id)
        .await
        .expect("Failed to deactivate");
    assert!(api_keys.create(user.id, "prod", None).await.is_ok());
}

#[tokio::test]
#[ignore]
async fn test_api_key_lookup_states() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let user = create_test_user(&db, "keyed@example.com").await;
    let api_keys = ApiKeyService::new(Arc::clone(&db.api_key_repo), 10);
    let now = Utc::now().naive_utc();

    let created = api_keys
        .create(user.id, "live", Some(30))
        .await
        .expect("Failed to create key");

    // An unknown secret finds nothing; that request gets a 401
    let missing = db
        .api_key_repo
        .find_by_hash(&auth::hash_api_key("trf_not_a_real_secret"))
        .await
        .expect("Lookup should not error");
    assert!(missing.is_none());

    // The real secret resolves and is usable
    let found = db
        .api_key_repo
        .find_by_hash(&auth::hash_api_key(&created.secret))
        .await
        .expect("Lookup should not error")
        .expect("Key should resolve");
    assert!(found.is_usable(now));
    assert_eq!(found.prefix, &created.secret[..8]);

    // A deactivated key still resolves but is refused; that request gets a 403
    api_keys
        .deactivate(user.id, created.key.id)
        .await
        .expect("Failed to deactivate");
    let deactivated = db
        .api_key_repo
        .find_by_hash(&auth::hash_api_key(&created.secret))
        .await
        .expect("Lookup should not error")
        .expect("Key should still resolve");
    assert!(!deactivated.is_usable(now));
}

#[tokio::test]
#[ignore]
async fn test_unknown_resources_map_to_404() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let fixtures = TestFixtures::create(&db).await;

    let courses = CourseService::new(Arc::clone(&db.course_repo));
    let missing_course = courses
        .detail(Uuid::new_v4())
        .await
        .expect_err("Unknown course should 404");
    assert_eq!(missing_course.status_code(), 404);

    let providers = ProviderConfig::default();
    let predictions = PredictionService::new(
        Arc::clone(&db.prediction_repo),
        Arc::clone(&db.course_repo),
        Arc::clone(&db.user_repo),
        Arc::clone(&db.notification_repo),
        Arc::new(ModelClient::new(&providers)),
        Arc::new(TaskRegistry::new(16)),
    );

    // A course nobody refreshed yet serves no prediction
    let no_prediction = predictions
        .get_for_course(fixtures.course.id, fixtures.user.id)
        .await
        .expect_err("Missing prediction should 404");
    assert_eq!(no_prediction.status_code(), 404);
}

#[tokio::test]
#[ignore]
async fn test_prediction_refresh_tier_and_task_ownership() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let fixtures = TestFixtures::create(&db).await;

    let providers = ProviderConfig::default();
    let predictions = Arc::new(PredictionService::new(
        Arc::clone(&db.prediction_repo),
        Arc::clone(&db.course_repo),
        Arc::clone(&db.user_repo),
        Arc::clone(&db.notification_repo),
        Arc::new(ModelClient::new(&providers)),
        Arc::new(TaskRegistry::new(16)),
    ));

    let free_refresh = predictions
        .refresh(fixtures.course.id, fixtures.user.id)
        .await
        .expect_err("Free tier cannot refresh");
    assert_eq!(free_refresh.status_code(), 403);

    db.user_repo
        .set_subscription_level(fixtures.user.id, "premium")
        .await
        .expect("Failed to upgrade user");

    let task_id = predictions
        .refresh(fixtures.course.id, fixtures.user.id)
        .await
        .expect("Paid tier should queue a refresh");

    // The queued record is visible to its owner and nobody else
    let record = predictions
        .task_status(task_id, fixtures.user.id)
        .await
        .expect("Owner should see the task");
    assert_eq!(record.id, task_id);
    assert_eq!(record.kind, "prediction_refresh");

    let stranger = create_test_user(&db, "stranger@example.com").await;
    let hidden = predictions
        .task_status(task_id, stranger.id)
        .await
        .expect_err("Foreign task should read as missing");
    assert_eq!(hidden.status_code(), 404);
}

#[tokio::test]
#[ignore]
async fn test_animation_simulations_require_premium() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let fixtures = TestFixtures::create(&db).await;

    let providers = ProviderConfig::default();
    let simulations = SimulationService::new(
        Arc::clone(&db.simulation_repo),
        Arc::clone(&db.course_repo),
        Arc::clone(&db.user_repo),
        Arc::new(ModelClient::new(&providers)),
    );

    let refused = simulations
        .create(
            fixtures.user.id,
            fixtures.course.id,
            SimulationType::Animation,
            None,
            serde_json::json!({"weather": "rain"}),
        )
        .await
        .expect_err("Free tier cannot run animations");
    assert_eq!(refused.status_code(), 403);

    // The refused request must not burn quota
    let quota = simulations
        .quota(fixtures.user.id)
        .await
        .expect("Failed to read quota");
    assert_eq!(quota.used_today, 0);
}

#[tokio::test]
#[ignore]
async fn test_upcoming_window_is_capped() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let now = Utc::now().naive_utc();
    create_test_course(&db, "ZET-2026-300", "Prix Proche", now + Duration::hours(20)).await;
    create_test_course(&db, "ZET-2026-301", "Prix Lointain", now + Duration::days(10)).await;

    let courses = CourseService::new(Arc::clone(&db.course_repo));

    // Requests beyond the cap are clamped to seven days
    let capped = courses
        .upcoming(Some(30))
        .await
        .expect("Failed to list upcoming");
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].name, "Prix Proche");

    let default_window = courses.upcoming(None).await.expect("Failed to list upcoming");
    assert_eq!(default_window.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_promotion_validation_reports_discount() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    create_test_user(&db, "curious@example.com").await;
    create_test_promotion(&db, "RENTREE30", 30, 100).await;

    let subscriptions = SubscriptionService::new(
        Arc::clone(&db.subscription_repo),
        Arc::clone(&db.user_repo),
        Arc::clone(&db.notification_repo),
    );

    let view = subscriptions
        .validate_promotion("RENTREE30")
        .await
        .expect("Valid code should resolve");
    assert_eq!(view.code, "RENTREE30");
    assert_eq!(view.discount_percent, 30);

    let bogus = subscriptions
        .validate_promotion("NOPE")
        .await
        .expect_err("Unknown code should fail");
    assert_eq!(bogus.status_code(), 400);
}
