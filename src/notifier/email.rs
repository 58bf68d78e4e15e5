use crate::config::ProviderConfig;
use crate::error::AppResult;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Message payload accepted by the email provider's HTTP API
#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// HTTP client for the transactional email provider
pub struct EmailClient {
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
    client: reqwest::Client,
}

impl EmailClient {
    /// Create a new EmailClient from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
            client,
        }
    }

    /// Check whether a provider is configured
    pub fn is_active(&self) -> bool {
        self.api_url.is_some()
    }

    /// Send one email; a missing provider configuration is a logged no-op
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()> {
        let api_url = match &self.api_url {
            Some(url) => url,
            None => {
                debug!(to, subject, "email provider not configured, skipping send");
                return Ok(());
            }
        };

        let payload = EmailPayload {
            from: &self.from,
            to,
            subject,
            text,
        };

        let mut request = self.client.post(api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if response.status().is_success() {
            info!(to, subject, "email dispatched");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(to, %status, "email provider rejected message");
            Err(crate::error::AppError::ExternalService(format!(
                "Email provider returned {}: {}",
                status, body
            )))
        }
    }

    /// Send the email-verification message for a freshly issued token
    pub async fn send_verification(&self, to: &str, token: &str) -> AppResult<()> {
        let text = format!(
            "Bienvenue sur Turf !\n\n\
             Confirmez votre adresse email avec le code suivant : {}\n\n\
             Ce code expire dans 48 heures.",
            token
        );
        self.send(to, "Confirmez votre adresse email", &text).await
    }

    /// Send the password-reset message for a freshly issued token
    pub async fn send_password_reset(&self, to: &str, token: &str) -> AppResult<()> {
        let text = format!(
            "Une réinitialisation de mot de passe a été demandée pour votre compte.\n\n\
             Code de réinitialisation : {}\n\n\
             Si vous n'êtes pas à l'origine de cette demande, ignorez ce message.",
            token
        );
        self.send(to, "Réinitialisation de votre mot de passe", &text)
            .await
    }
}
