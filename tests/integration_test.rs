//! Service-level flows against a real PostgreSQL database.
//!
//! These tests are ignored by default; point TEST_DATABASE_URL at a scratch
//! database and run `cargo test -- --ignored` to execute them.

mod helpers;

use chrono::{Duration, Utc};
use helpers::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use turf_backend::clients::{IdentityClient, ModelClient};
use turf_backend::config::{AuthConfig, ProviderConfig};
use turf_backend::models::*;
use turf_backend::notifier::{EmailClient, PushClient};
use turf_backend::services::*;
use turf_backend::tasks::TaskRegistry;

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

fn subscription_service(db: &TestDatabase) -> SubscriptionService {
    SubscriptionService::new(
        Arc::clone(&db.subscription_repo),
        Arc::clone(&db.user_repo),
        Arc::clone(&db.notification_repo),
    )
}

fn notification_service(db: &TestDatabase) -> NotificationService {
    let providers = ProviderConfig::default();
    NotificationService::new(
        Arc::clone(&db.notification_repo),
        Arc::clone(&db.user_repo),
        Arc::new(EmailClient::new(&providers)),
        Arc::new(PushClient::new(&providers)),
    )
}

fn prediction_service(db: &TestDatabase) -> PredictionService {
    let providers = ProviderConfig::default();
    PredictionService::new(
        Arc::clone(&db.prediction_repo),
        Arc::clone(&db.course_repo),
        Arc::clone(&db.user_repo),
        Arc::clone(&db.notification_repo),
        Arc::new(ModelClient::new(&providers)),
        Arc::new(TaskRegistry::new(16)),
    )
}

fn simulation_service(db: &TestDatabase) -> SimulationService {
    let providers = ProviderConfig::default();
    SimulationService::new(
        Arc::clone(&db.simulation_repo),
        Arc::clone(&db.course_repo),
        Arc::clone(&db.user_repo),
        Arc::new(ModelClient::new(&providers)),
    )
}

#[tokio::test]
#[ignore]
async fn test_register_login_refresh_rotation() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);

    let registered = auth
        .register("rider@example.com", TEST_PASSWORD, Some("Rider"))
        .await
        .expect("Failed to register");
    assert_eq!(registered.user.email, "rider@example.com");
    assert_eq!(registered.user.subscription_level, "free");
    assert_eq!(registered.token_type, "Bearer");
    assert!(!registered.access_token.is_empty());

    let logged_in = auth
        .login("Rider@Example.com", TEST_PASSWORD)
        .await
        .expect("Failed to login with uppercase email");
    assert_eq!(logged_in.user.id, registered.user.id);

    // Each refresh token works exactly once
    let refreshed = auth
        .refresh(&logged_in.refresh_token)
        .await
        .expect("Failed to refresh");
    assert_ne!(refreshed.refresh_token, logged_in.refresh_token);

    let replay = auth.refresh(&logged_in.refresh_token).await;
    assert!(matches!(replay, Err(turf_backend::AppError::Unauthorized(_))));

    // Logout revokes, and is idempotent for unknown tokens
    auth.logout(&refreshed.refresh_token)
        .await
        .expect("Failed to logout");
    auth.logout(&refreshed.refresh_token)
        .await
        .expect("Second logout should be a no-op");

    let after_logout = auth.refresh(&refreshed.refresh_token).await;
    assert!(after_logout.is_err());
}

#[tokio::test]
#[ignore]
async fn test_password_reset_flow() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let auth = auth_service(&db);

    let user = create_test_user(&db, "forgetful@example.com").await;

    // Unknown addresses get the same silent success
    auth.forgot_password("nobody@example.com")
        .await
        .expect("Unknown email must not error");

    auth.forgot_password("forgetful@example.com")
        .await
        .expect("Failed to start reset");

    let token: String =
        sqlx::query_scalar("SELECT token FROM password_reset_tokens WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&db.pool)
            .await
            .expect("Reset token should be stored");

    auth.reset_password(&token, "fresh new password")
        .await
        .expect("Failed to reset password");

    assert!(auth
        .login("forgetful@example.com", "fresh new password")
        .await
        .is_ok());
    assert!(auth.login("forgetful@example.com", TEST_PASSWORD).await.is_err());

    // A reset token is single use
    let replay = auth.reset_password(&token, "yet another password").await;
    assert!(matches!(replay, Err(turf_backend::AppError::Validation(_))));
}

#[tokio::test]
#[ignore]
async fn test_course_upsert_and_odds_history() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let race_date = Utc::now().naive_utc() + Duration::hours(4);
    let course = create_test_course(&db, "ZET-2026-100", "Prix d'Essai", race_date).await;
    let participation = add_test_runner(&db, course.id, 1, "Ouragan", Some(Decimal::new(45, 1))).await;

    // Upserting the same external_ref updates in place
    let renamed = db
        .course_repo
        .upsert_by_external_ref(
            "ZET-2026-100",
            "Prix d'Essai (R1C3)",
            "Vincennes",
            race_date,
            2700,
            "trot",
            CourseStatus::Scheduled.as_str(),
        )
        .await
        .expect("Failed to upsert course");
    assert_eq!(renamed.id, course.id);
    assert_eq!(renamed.name, "Prix d'Essai (R1C3)");
    assert_eq!(renamed.field_size, 1);

    // Every odds write lands in the history, newest value on the runner
    db.course_repo
        .record_odds(participation.id, Decimal::new(38, 1))
        .await
        .expect("Failed to record odds");

    let history = db
        .course_repo
        .cotes_for_participation(participation.id)
        .await
        .expect("Failed to read odds history");
    assert_eq!(history.len(), 2);

    let updated = db
        .course_repo
        .find_participation(course.id, 1)
        .await
        .expect("Failed to read participation")
        .expect("Participation should exist");
    assert_eq!(updated.current_odds, Some(Decimal::new(38, 1)));

    // Non-positive quotes are rejected
    let rejected = db.course_repo.record_odds(participation.id, Decimal::ZERO).await;
    assert!(rejected.is_err());
}

#[tokio::test]
#[ignore]
async fn test_final_positions_and_evaluation() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let race_date = Utc::now().naive_utc() - Duration::hours(2);
    let course = create_test_course(&db, "ZET-2026-200", "Prix du Verdict", race_date).await;
    for (numero, name) in [(1, "Alpha"), (2, "Bravo"), (3, "Charlie")] {
        add_test_runner(&db, course.id, numero, name, None).await;
    }

    let prediction = create_test_prediction(&db, course.id, &[2, 1, 3]).await;

    // Results arrive: 2 wins, then 3, then 1
    for (numero, position) in [(2, 1), (3, 2), (1, 3)] {
        let recorded = db
            .course_repo
            .record_final_position(course.id, numero, position)
            .await
            .expect("Failed to record final position");
        assert!(recorded);
    }
    let unknown = db
        .course_repo
        .record_final_position(course.id, 99, 4)
        .await
        .expect("Unknown numero should not error");
    assert!(!unknown);

    db.course_repo
        .update_status(course.id, CourseStatus::Finished.as_str())
        .await
        .expect("Failed to finish course");

    let predictions = prediction_service(&db);
    let evaluation = predictions
        .evaluate_course(course.id)
        .await
        .expect("Failed to evaluate")
        .expect("Evaluation should be produced");
    assert_eq!(evaluation.prediction_id, prediction.id);
    assert!(evaluation.winner_hit);
    assert_eq!(evaluation.podium_hits, 3);

    // A second pass returns the stored evaluation instead of a new row
    let again = predictions
        .evaluate_course(course.id)
        .await
        .expect("Failed to re-evaluate")
        .expect("Evaluation should still exist");
    assert_eq!(again.id, evaluation.id);

    let swept = predictions
        .evaluate_finished_courses(Utc::now().naive_utc() - Duration::days(1))
        .await
        .expect("Failed to sweep finished courses");
    assert_eq!(swept, 0, "already-evaluated courses are not re-counted");
}

#[tokio::test]
#[ignore]
async fn test_subscription_with_promo_and_cancel() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "abonne@example.com").await;
    create_test_promotion(&db, "TURF20", 20, 5).await;
    let subscriptions = subscription_service(&db);

    let outcome = subscriptions
        .subscribe(user.id, "standard", Some("TURF20"))
        .await
        .expect("Failed to subscribe");
    assert_eq!(outcome.subscription.plan_code, "standard");
    assert_eq!(outcome.payment.amount, Decimal::new(792, 2));
    assert_eq!(outcome.applied_discount_percent, Some(20));

    let upgraded = db
        .user_repo
        .find_by_id(user.id)
        .await
        .expect("Failed to reload user")
        .expect("User should exist");
    assert_eq!(upgraded.subscription_level, "standard");

    let current = subscriptions
        .current(user.id)
        .await
        .expect("Failed to read current subscription")
        .expect("Subscription should be active");
    assert!(current.is_active(Utc::now().naive_utc()));

    // Cancelling ends access immediately and drops the account to free
    let cancelled = subscriptions.cancel(user.id).await.expect("Failed to cancel");
    assert_eq!(cancelled.status, "cancelled");

    let downgraded = db
        .user_repo
        .find_by_id(user.id)
        .await
        .expect("Failed to reload user")
        .expect("User should exist");
    assert_eq!(downgraded.subscription_level, "free");

    assert!(subscriptions
        .current(user.id)
        .await
        .expect("Failed to read current subscription")
        .is_none());

    // Both the purchase notice and the cancellation notice are stored
    let notices = db
        .notification_repo
        .list_for_user(user.id, false, 20, 0)
        .await
        .expect("Failed to list notifications");
    assert_eq!(notices.len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_promo_exhaustion_blocks_purchase() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let first = create_test_user(&db, "first@example.com").await;
    let second = create_test_user(&db, "second@example.com").await;
    create_test_promotion(&db, "ONCE", 50, 1).await;
    let subscriptions = subscription_service(&db);

    subscriptions
        .subscribe(first.id, "premium", Some("ONCE"))
        .await
        .expect("First redemption should pass");

    let blocked = subscriptions.subscribe(second.id, "premium", Some("ONCE")).await;
    assert!(blocked.is_err());

    // The failed purchase must not leave a subscription behind
    assert!(subscriptions
        .current(second.id)
        .await
        .expect("Failed to read current subscription")
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_expired_subscriptions_are_downgraded() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "lapsed@example.com").await;
    let now = Utc::now().naive_utc();

    db.subscription_repo
        .subscribe(
            user.id,
            "standard",
            now - Duration::days(40),
            now - Duration::days(10),
            Decimal::new(990, 2),
            "EUR",
            None,
        )
        .await
        .expect("Failed to create overdue subscription");
    db.user_repo
        .set_subscription_level(user.id, "standard")
        .await
        .expect("Failed to set level");

    let expired = db
        .subscription_repo
        .expire_overdue(now)
        .await
        .expect("Failed to expire");
    assert_eq!(expired, vec![user.id]);

    db.user_repo
        .downgrade_to_free(&expired)
        .await
        .expect("Failed to downgrade");

    let downgraded = db
        .user_repo
        .find_by_id(user.id)
        .await
        .expect("Failed to reload user")
        .expect("User should exist");
    assert_eq!(downgraded.subscription_level, "free");

    // A second sweep finds nothing
    let again = db
        .subscription_repo
        .expire_overdue(now)
        .await
        .expect("Failed to re-expire");
    assert!(again.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_simulation_quota_for_free_tier() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "joueur@example.com").await;
    let today = Utc::now().date_naive();

    for expected in 1..=3 {
        let taken = db
            .simulation_repo
            .try_consume_quota(user.id, today, 3)
            .await
            .expect("Failed to consume quota");
        assert_eq!(taken, Some(expected));
    }

    let over = db
        .simulation_repo
        .try_consume_quota(user.id, today, 3)
        .await
        .expect("Quota check should not error");
    assert_eq!(over, None);

    let quota = simulation_service(&db)
        .quota(user.id)
        .await
        .expect("Failed to read quota");
    assert_eq!(quota.used_today, 3);
    assert_eq!(quota.daily_limit, Some(3));
    assert_eq!(quota.remaining, Some(0));
}

#[tokio::test]
#[ignore]
async fn test_notification_settings_and_devices() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "notified@example.com").await;
    let notifications = notification_service(&db);

    // Never-saved settings read as defaults
    let settings = notifications
        .settings(user.id)
        .await
        .expect("Failed to read settings");
    assert!(settings.push_enabled);
    assert!(!settings.promotional);

    let patch = SettingsPatch {
        promotional: Some(true),
        push_enabled: Some(false),
        ..Default::default()
    };
    let saved = notifications
        .update_settings(user.id, patch)
        .await
        .expect("Failed to update settings");
    assert!(saved.promotional);
    assert!(!saved.push_enabled);
    assert!(saved.course_reminders, "untouched fields keep their value");

    let device = notifications
        .register_device(user.id, "expo-token-1", "ios")
        .await
        .expect("Failed to register device");
    assert_eq!(device.platform, "ios");

    let rejected = notifications
        .register_device(user.id, "expo-token-2", "blackberry")
        .await;
    assert!(matches!(rejected, Err(turf_backend::AppError::Validation(_))));

    notifications
        .remove_device(user.id, device.id)
        .await
        .expect("Failed to remove device");
    let missing = notifications.remove_device(user.id, device.id).await;
    assert!(matches!(missing, Err(turf_backend::AppError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_notification_read_flow_and_dispatch() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "reader@example.com").await;
    let notifications = notification_service(&db);

    for i in 0..3 {
        notifications
            .notify(
                user.id,
                NotificationKind::System,
                format!("Notice {}", i),
                "Corps du message".to_string(),
                None,
            )
            .await
            .expect("Failed to store notification");
    }

    let unread = notifications
        .list(user.id, true, None, None)
        .await
        .expect("Failed to list unread");
    assert_eq!(unread.len(), 3);

    notifications
        .mark_read(user.id, unread[0].id)
        .await
        .expect("Failed to mark read");
    let remaining = notifications
        .list(user.id, true, None, None)
        .await
        .expect("Failed to list unread");
    assert_eq!(remaining.len(), 2);

    let marked = notifications
        .mark_all_read(user.id)
        .await
        .expect("Failed to mark all read");
    assert_eq!(marked, 2);

    // Without configured providers dispatch still drains the queue
    let processed = notifications
        .dispatch_pending(50)
        .await
        .expect("Failed to dispatch");
    assert_eq!(processed, 3);
    let processed_again = notifications
        .dispatch_pending(50)
        .await
        .expect("Failed to dispatch again");
    assert_eq!(processed_again, 0);
}

#[tokio::test]
#[ignore]
async fn test_stale_token_cleanup() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let user = create_test_user(&db, "stale@example.com").await;
    let now = Utc::now().naive_utc();

    db.token_repo
        .create_refresh_token(user.id, "expired-token", now - Duration::days(1))
        .await
        .expect("Failed to create expired token");
    db.token_repo
        .create_refresh_token(user.id, "live-token", now + Duration::days(29))
        .await
        .expect("Failed to create live token");

    let deleted = db
        .token_repo
        .delete_stale(now)
        .await
        .expect("Failed to delete stale tokens");
    assert_eq!(deleted, 1);

    assert!(db
        .token_repo
        .find_refresh_token("expired-token")
        .await
        .expect("Lookup should not error")
        .is_none());
    assert!(db
        .token_repo
        .find_refresh_token("live-token")
        .await
        .expect("Lookup should not error")
        .is_some());
}

#[tokio::test]
#[ignore]
async fn test_commentaires_follow_their_course() {
    let db = TestDatabase::new().await;
    db.cleanup().await;

    let fixtures = TestFixtures::create(&db).await;
    let courses = CourseService::new(Arc::clone(&db.course_repo));

    let posted = courses
        .add_commentaire(
            fixtures.course.id,
            fixtures.user.id,
            "Belle piste, attention au numéro 2.",
        )
        .await
        .expect("Failed to post commentaire");
    assert_eq!(posted.course_id, fixtures.course.id);

    let listed = courses
        .commentaires(fixtures.course.id)
        .await
        .expect("Failed to list commentaires");
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0].author_name.as_deref(),
        Some(fixtures.user.display_name.as_str())
    );

    let detail = courses
        .detail(fixtures.course.id)
        .await
        .expect("Failed to read course detail");
    assert_eq!(detail.participations.len(), 3);
    assert_courses_equal(&detail.course, &fixtures.course);
}
