use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Largest batch the provider accepts in one request
const MAX_BATCH_SIZE: usize = 100;

/// One push message in the provider's batch format
#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
}

/// HTTP client for the push notification provider
pub struct PushClient {
    api_url: Option<String>,
    client: reqwest::Client,
}

impl PushClient {
    /// Create a new PushClient from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            api_url: config.push_api_url.clone(),
            client,
        }
    }

    /// Check whether a provider is configured
    pub fn is_active(&self) -> bool {
        self.api_url.is_some()
    }

    /// Push one message to a batch of device tokens
    ///
    /// Batches above the provider's size limit are split and the chunks
    /// sent concurrently. Returns the number of messages the provider
    /// accepted; a missing provider configuration is a logged no-op.
    pub async fn send(
        &self,
        device_tokens: &[String],
        title: &str,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> AppResult<usize> {
        if device_tokens.is_empty() {
            return Ok(0);
        }

        let api_url = match &self.api_url {
            Some(url) => url,
            None => {
                debug!(title, "push provider not configured, skipping send");
                return Ok(0);
            }
        };

        let messages: Vec<PushMessage> = device_tokens
            .iter()
            .map(|token| PushMessage {
                to: token,
                title,
                body,
                data,
            })
            .collect();

        let requests = messages
            .chunks(MAX_BATCH_SIZE)
            .map(|chunk| self.client.post(api_url).json(chunk).send());
        let responses = futures::future::join_all(requests).await;

        let mut delivered = 0usize;
        let mut last_error = None;
        for (chunk, result) in messages.chunks(MAX_BATCH_SIZE).zip(responses) {
            match result {
                Ok(response) if response.status().is_success() => delivered += chunk.len(),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!(%status, "push provider rejected batch");
                    last_error = Some(AppError::ExternalService(format!(
                        "Push provider returned {}: {}",
                        status, text
                    )));
                }
                Err(e) => {
                    warn!(error = %e, "push request failed");
                    last_error = Some(AppError::from(e));
                }
            }
        }

        if delivered == 0 {
            if let Some(error) = last_error {
                return Err(error);
            }
        }

        info!(delivered, title, "push batch dispatched");
        Ok(delivered)
    }
}
