//! Request middleware: authentication extractors and rate limiting

pub mod auth;
pub mod rate_limit;

pub use auth::{ApiClient, AuthUser, Identity};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
