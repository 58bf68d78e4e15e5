//! HTTP clients for the external services the backend depends on

pub mod feed;
pub mod identity;
pub mod model;

pub use feed::{FeedClient, FeedCourse, FeedRunner};
pub use identity::{FederatedIdentity, IdentityClient};
pub use model::{ModelClient, PredictResponse};
