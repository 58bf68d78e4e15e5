pub mod api_key_repository;
pub mod course_repository;
pub mod notification_repository;
pub mod prediction_repository;
pub mod simulation_repository;
pub mod subscription_repository;
pub mod token_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use api_key_repository::ApiKeyRepository;
pub use course_repository::CourseRepository;
pub use notification_repository::NotificationRepository;
pub use prediction_repository::PredictionRepository;
pub use simulation_repository::SimulationRepository;
pub use subscription_repository::SubscriptionRepository;
pub use token_repository::TokenRepository;
pub use user_repository::UserRepository;
