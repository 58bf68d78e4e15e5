//! Provider client behavior against mocked HTTP endpoints.
//!
//! No database needed; wiremock binds a local port per test.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use turf_backend::clients::{FeedClient, IdentityClient, ModelClient};
use turf_backend::config::ProviderConfig;
use turf_backend::error::AppError;
use turf_backend::models::{Course, ParticipationDetail};
use turf_backend::notifier::{EmailClient, PushClient};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn course_fixture() -> Course {
    Course::new(
        Some("ZET-2026-042".to_string()),
        "Prix de Wiremock".to_string(),
        "Vincennes".to_string(),
        Utc::now().naive_utc(),
        2700,
        "trot".to_string(),
    )
}

fn field_fixture(course_id: Uuid) -> Vec<ParticipationDetail> {
    vec![
        ParticipationDetail {
            id: Uuid::new_v4(),
            course_id,
            cheval_id: Uuid::new_v4(),
            numero: 1,
            cheval_name: "Tornade".to_string(),
            jockey_name: Some("Driver 1".to_string()),
            weight_kg: None,
            current_odds: Some(Decimal::new(45, 1)),
            final_position: None,
        },
        ParticipationDetail {
            id: Uuid::new_v4(),
            course_id,
            cheval_id: Uuid::new_v4(),
            numero: 2,
            cheval_name: "Eclair du Nord".to_string(),
            jockey_name: None,
            weight_kg: None,
            current_odds: None,
            final_position: None,
        },
    ]
}

// ===== Email =====

#[tokio::test]
async fn test_email_client_posts_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_json(json!({
            "from": "no-reply@turf.example",
            "to": "rider@example.com",
            "subject": "Bonjour",
            "text": "Bienvenue !",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        email_api_url: Some(server.uri()),
        email_api_key: Some("sk_test".to_string()),
        ..ProviderConfig::default()
    };

    EmailClient::new(&config)
        .send("rider@example.com", "Bonjour", "Bienvenue !")
        .await
        .expect("Send should pass");
}

#[tokio::test]
async fn test_email_client_without_provider_is_noop() {
    let client = EmailClient::new(&ProviderConfig::default());
    assert!(!client.is_active());

    // No endpoint configured, no request made, no error raised
    client
        .send("rider@example.com", "Bonjour", "Bienvenue !")
        .await
        .expect("Unconfigured send should be a no-op");
}

#[tokio::test]
async fn test_email_client_surfaces_provider_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("mailbox on fire"))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        email_api_url: Some(server.uri()),
        ..ProviderConfig::default()
    };

    let err = EmailClient::new(&config)
        .send("rider@example.com", "Bonjour", "Bienvenue !")
        .await
        .expect_err("Rejected send should error");
    assert!(matches!(err, AppError::ExternalService(_)));
    assert_eq!(err.status_code(), 502);
}

// ===== Push =====

#[tokio::test]
async fn test_push_client_batches_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!([
            {"to": "device-a", "title": "Départ imminent", "body": "La course s'élance"},
            {"to": "device-b", "title": "Départ imminent", "body": "La course s'élance"},
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        push_api_url: Some(server.uri()),
        ..ProviderConfig::default()
    };

    let sent = PushClient::new(&config)
        .send(
            &["device-a".to_string(), "device-b".to_string()],
            "Départ imminent",
            "La course s'élance",
            None,
        )
        .await
        .expect("Push should pass");
    assert_eq!(sent, 2);
}

#[tokio::test]
async fn test_push_client_splits_oversized_batches() {
    let server = MockServer::start().await;

    // 101 tokens exceed the provider's batch limit and go out as two requests
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        push_api_url: Some(server.uri()),
        ..ProviderConfig::default()
    };

    let tokens: Vec<String> = (0..101).map(|i| format!("device-{}", i)).collect();
    let sent = PushClient::new(&config)
        .send(&tokens, "Départ imminent", "La course s'élance", None)
        .await
        .expect("Chunked push should pass");
    assert_eq!(sent, 101);
}

#[tokio::test]
async fn test_push_client_skips_empty_batches() {
    let config = ProviderConfig {
        push_api_url: Some("http://localhost:1".to_string()),
        ..ProviderConfig::default()
    };

    // An empty token list never reaches the provider
    let sent = PushClient::new(&config)
        .send(&[], "Titre", "Corps", None)
        .await
        .expect("Empty batch should be a no-op");
    assert_eq!(sent, 0);
}

// ===== Identity =====

#[tokio::test]
async fn test_identity_userinfo_resolves_profile() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer provider-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "fed@example.com",
            "name": "Fed Erated",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        identity_userinfo_url: Some(format!("{}/userinfo", server.uri())),
        ..ProviderConfig::default()
    };

    let identity = IdentityClient::new(&config)
        .userinfo("provider-token")
        .await
        .expect("Userinfo should resolve");
    assert_eq!(identity.email, "fed@example.com");
    assert_eq!(identity.name.as_deref(), Some("Fed Erated"));
}

#[tokio::test]
async fn test_identity_rejected_token_maps_to_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        identity_userinfo_url: Some(format!("{}/userinfo", server.uri())),
        ..ProviderConfig::default()
    };

    let err = IdentityClient::new(&config)
        .userinfo("stolen-token")
        .await
        .expect_err("Rejected token should error");
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_identity_provider_outage_is_not_a_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        identity_userinfo_url: Some(format!("{}/userinfo", server.uri())),
        ..ProviderConfig::default()
    };

    let err = IdentityClient::new(&config)
        .userinfo("provider-token")
        .await
        .expect_err("Outage should error");
    assert!(matches!(err, AppError::ExternalService(_)));
}

// ===== Model service =====

#[tokio::test]
async fn test_model_predict_parses_ranking() {
    let server = MockServer::start().await;
    let course = course_fixture();
    let field = field_fixture(course.id);

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": "gbt-2026-08",
            "ranking": [
                {"numero": 2, "cheval_id": field[1].cheval_id, "probability": 0.41},
                {"numero": 1, "cheval_id": field[0].cheval_id, "probability": 0.27},
            ],
            "confidence": 0.83,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        model_api_url: server.uri(),
        ..ProviderConfig::default()
    };

    let prediction = ModelClient::new(&config)
        .predict(&course, &field)
        .await
        .expect("Predict should pass");
    assert_eq!(prediction.model_version, "gbt-2026-08");
    assert_eq!(prediction.ranking.len(), 2);
    assert_eq!(prediction.ranking[0].numero, 2);
    assert_eq!(prediction.confidence, Some(0.83));
}

#[tokio::test]
async fn test_model_empty_ranking_is_an_error() {
    let server = MockServer::start().await;
    let course = course_fixture();
    let field = field_fixture(course.id);

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": "gbt-2026-08",
            "ranking": [],
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        model_api_url: server.uri(),
        ..ProviderConfig::default()
    };

    let err = ModelClient::new(&config)
        .predict(&course, &field)
        .await
        .expect_err("Empty ranking should error");
    assert!(matches!(err, AppError::ExternalService(_)));
}

#[tokio::test]
async fn test_model_simulate_returns_document() {
    let server = MockServer::start().await;
    let course = course_fixture();

    Mock::given(method("POST"))
        .and(path("/simulate"))
        .and(body_json(json!({
            "course_id": course.id,
            "simulation_type": "standard",
            "parameters": {"weather": "rain"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finish_order": [2, 1],
            "iterations": 5000,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        model_api_url: server.uri(),
        ..ProviderConfig::default()
    };

    let results = ModelClient::new(&config)
        .simulate(&course, "standard", &json!({"weather": "rain"}))
        .await
        .expect("Simulate should pass");
    assert_eq!(results["iterations"], 5000);
}

#[tokio::test]
async fn test_model_training_trigger() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/train"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        model_api_url: server.uri(),
        ..ProviderConfig::default()
    };

    ModelClient::new(&config)
        .trigger_training()
        .await
        .expect("Training trigger should pass");
}

// ===== Racing data feed =====

#[tokio::test]
async fn test_feed_programme_parses_courses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/programme"))
        .and(query_param("from", "2026-08-25"))
        .and(query_param("to", "2026-09-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "ref": "ZET-2026-050",
                "name": "Prix du Flux",
                "hippodrome": "Chantilly",
                "race_date": "2026-08-26T13:05:00",
                "distance_m": 1600,
                "discipline": "plat",
                "status": "scheduled",
                "runners": [
                    {"numero": 1, "cheval": "Rafale", "odds": "3.4", "jockey": "A. Dupont"},
                    {"numero": 2, "cheval": "Mistral", "final_position": null},
                ],
            },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        feed_api_url: Some(server.uri()),
        ..ProviderConfig::default()
    };

    let from = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
    let programme = FeedClient::new(&config)
        .programme(from, to)
        .await
        .expect("Programme should parse");

    assert_eq!(programme.len(), 1);
    let course = &programme[0];
    assert_eq!(course.external_ref, "ZET-2026-050");
    assert_eq!(course.runners.len(), 2);
    assert_eq!(course.runners[0].odds, Some(Decimal::new(34, 1)));
    assert_eq!(course.runners[1].jockey, None);
}

#[tokio::test]
async fn test_feed_without_provider_returns_empty_programme() {
    let client = FeedClient::new(&ProviderConfig::default());
    assert!(!client.is_active());

    let from = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
    let programme = client
        .programme(from, to)
        .await
        .expect("Unconfigured feed should idle");
    assert!(programme.is_empty());
}

#[tokio::test]
async fn test_feed_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        feed_api_url: Some(server.uri()),
        ..ProviderConfig::default()
    };

    let from = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
    let err = FeedClient::new(&config)
        .programme(from, to)
        .await
        .expect_err("Feed failure should error");
    assert!(matches!(err, AppError::ExternalService(_)));
}
