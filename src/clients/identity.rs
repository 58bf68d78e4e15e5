use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use tracing::warn;

/// Profile returned by the federated identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedIdentity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// HTTP client for the federated identity provider's userinfo endpoint
pub struct IdentityClient {
    userinfo_url: Option<String>,
    client: reqwest::Client,
}

impl IdentityClient {
    /// Create a new IdentityClient from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            userinfo_url: config.identity_userinfo_url.clone(),
            client,
        }
    }

    /// Check whether a provider is configured
    pub fn is_active(&self) -> bool {
        self.userinfo_url.is_some()
    }

    /// Resolve a provider-issued access token to the holder's profile
    ///
    /// Federated login cannot degrade to a no-op: without a configured
    /// provider this returns an error.
    pub async fn userinfo(&self, provider_token: &str) -> AppResult<FederatedIdentity> {
        let url = self.userinfo_url.as_ref().ok_or_else(|| {
            AppError::ExternalService("Identity provider is not configured".to_string())
        })?;

        let response = self
            .client
            .get(url)
            .bearer_auth(provider_token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(
                "Identity provider rejected the token".to_string(),
            ));
        }
        if !status.is_success() {
            warn!(%status, "identity provider returned an error");
            return Err(AppError::ExternalService(format!(
                "Identity provider returned {}",
                status
            )));
        }

        let identity = response.json::<FederatedIdentity>().await?;
        if identity.email.trim().is_empty() {
            return Err(AppError::ExternalService(
                "Identity provider returned no email".to_string(),
            ));
        }

        Ok(identity)
    }
}
