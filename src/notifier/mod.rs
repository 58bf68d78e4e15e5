//! Outbound notification transports (email and push)
//!
//! Both clients are gated on their provider URL being configured; without
//! it they degrade to logged no-ops so development setups need no accounts.

pub mod email;
pub mod push;

pub use email::EmailClient;
pub use push::PushClient;
