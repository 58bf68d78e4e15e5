//! Turf backend library
//!
//! Exposes the backend components for the binary, the integration tests and
//! any embedding consumers.

pub mod auth;
pub mod clients;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clients::{FeedClient, IdentityClient, ModelClient};
use database::Database;
use middleware::RateLimiter;
use notifier::{EmailClient, PushClient};
use repositories::*;
use services::*;
use std::sync::Arc;
use std::time::Duration;
use tasks::TaskRegistry;

/// How many background task records are kept in memory
const TASK_REGISTRY_CAPACITY: usize = 256;

/// Application state shared across handlers and background loops
pub struct AppState {
    pub config: AppConfig,
    pub database: Database,

    pub user_repo: Arc<UserRepository>,
    pub token_repo: Arc<TokenRepository>,
    pub course_repo: Arc<CourseRepository>,
    pub prediction_repo: Arc<PredictionRepository>,
    pub simulation_repo: Arc<SimulationRepository>,
    pub subscription_repo: Arc<SubscriptionRepository>,
    pub notification_repo: Arc<NotificationRepository>,
    pub api_key_repo: Arc<ApiKeyRepository>,

    pub email_client: Arc<EmailClient>,
    pub push_client: Arc<PushClient>,
    pub identity_client: Arc<IdentityClient>,
    pub model_client: Arc<ModelClient>,
    pub feed_client: Arc<FeedClient>,

    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub course_service: Arc<CourseService>,
    pub prediction_service: Arc<PredictionService>,
    pub simulation_service: Arc<SimulationService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub notification_service: Arc<NotificationService>,
    pub api_key_service: Arc<ApiKeyService>,

    pub registry: Arc<TaskRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire repositories, clients and services over one connection pool
    pub fn new(pool: sqlx::PgPool, config: AppConfig) -> Self {
        let database = Database::new(pool.clone());

        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let token_repo = Arc::new(TokenRepository::new(pool.clone()));
        let course_repo = Arc::new(CourseRepository::new(pool.clone()));
        let prediction_repo = Arc::new(PredictionRepository::new(pool.clone()));
        let simulation_repo = Arc::new(SimulationRepository::new(pool.clone()));
        let subscription_repo = Arc::new(SubscriptionRepository::new(pool.clone()));
        let notification_repo = Arc::new(NotificationRepository::new(pool.clone()));
        let api_key_repo = Arc::new(ApiKeyRepository::new(pool));

        let email_client = Arc::new(EmailClient::new(&config.providers));
        let push_client = Arc::new(PushClient::new(&config.providers));
        let identity_client = Arc::new(IdentityClient::new(&config.providers));
        let model_client = Arc::new(ModelClient::new(&config.providers));
        let feed_client = Arc::new(FeedClient::new(&config.providers));

        let registry = Arc::new(TaskRegistry::new(TASK_REGISTRY_CAPACITY));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.limits.rate_limit_max_requests,
            Duration::from_secs(config.limits.rate_limit_window_secs),
        ));

        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&user_repo),
            Arc::clone(&token_repo),
            Arc::clone(&email_client),
            Arc::clone(&identity_client),
            config.auth.clone(),
        ));
        let user_service = Arc::new(UserService::new(
            Arc::clone(&user_repo),
            Arc::clone(&token_repo),
        ));
        let course_service = Arc::new(CourseService::new(Arc::clone(&course_repo)));
        let prediction_service = Arc::new(PredictionService::new(
            Arc::clone(&prediction_repo),
            Arc::clone(&course_repo),
            Arc::clone(&user_repo),
            Arc::clone(&notification_repo),
            Arc::clone(&model_client),
            Arc::clone(&registry),
        ));
        let simulation_service = Arc::new(SimulationService::new(
            Arc::clone(&simulation_repo),
            Arc::clone(&course_repo),
            Arc::clone(&user_repo),
            Arc::clone(&model_client),
        ));
        let subscription_service = Arc::new(SubscriptionService::new(
            Arc::clone(&subscription_repo),
            Arc::clone(&user_repo),
            Arc::clone(&notification_repo),
        ));
        let notification_service = Arc::new(NotificationService::new(
            Arc::clone(&notification_repo),
            Arc::clone(&user_repo),
            Arc::clone(&email_client),
            Arc::clone(&push_client),
        ));
        let api_key_service = Arc::new(ApiKeyService::new(
            Arc::clone(&api_key_repo),
            config.limits.api_keys_max_per_user,
        ));

        Self {
            config,
            database,
            user_repo,
            token_repo,
            course_repo,
            prediction_repo,
            simulation_repo,
            subscription_repo,
            notification_repo,
            api_key_repo,
            email_client,
            push_client,
            identity_client,
            model_client,
            feed_client,
            auth_service,
            user_service,
            course_service,
            prediction_service,
            simulation_service,
            subscription_service,
            notification_service,
            api_key_service,
            registry,
            rate_limiter,
        }
    }
}
