pub mod api_key_service;
pub mod auth_service;
pub mod course_service;
pub mod notification_service;
pub mod prediction_service;
pub mod simulation_service;
pub mod subscription_service;
pub mod user_service;

pub use api_key_service::{ApiKeyService, CreatedApiKey};
pub use auth_service::{AuthService, AuthTokens};
pub use course_service::{CourseDetail, CourseService};
pub use notification_service::{NotificationService, SettingsPatch};
pub use prediction_service::{AccuracyStats, PredictionService, PredictionView};
pub use simulation_service::{QuotaView, SimulationService};
pub use subscription_service::{PromotionView, SubscriptionOutcome, SubscriptionService};
pub use user_service::UserService;
