//! Domain models for the Turf backend.
//!
//! This module contains all database-backed models representing
//! the core entities of the horse-race prediction platform.

pub mod api_key;
pub mod commentaire;
pub mod cote;
pub mod course;
pub mod notification;
pub mod participation;
pub mod prediction;
pub mod simulation;
pub mod subscription;
pub mod token;
pub mod user;

// Re-export all models for convenient access
pub use api_key::ApiKey;
pub use commentaire::{CommentaireCourse, CommentaireDetail};
pub use cote::CoteHistorique;
pub use course::{Course, CourseStatus};
pub use notification::{Notification, NotificationKind, NotificationSettings, UserDevice};
pub use participation::{Cheval, Jockey, Participation, ParticipationDetail};
pub use prediction::{Prediction, PredictionEvaluation, RankedRunner};
pub use simulation::{Simulation, SimulationType, SimulationUsage};
pub use subscription::{
    PaymentTransaction, PromotionCode, SubscriptionPlan, SubscriptionStatus, UserSubscription,
};
pub use token::{PasswordResetToken, RefreshToken, VerificationToken};
pub use user::{SubscriptionLevel, User, UserProfile};
