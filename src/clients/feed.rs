use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

/// One runner as published by the racing data feed
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRunner {
    pub numero: i32,
    pub cheval: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub jockey: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub odds: Option<Decimal>,
    #[serde(default)]
    pub final_position: Option<i32>,
}

/// One course as published by the racing data feed
///
/// `external_ref` is the feed's stable identifier and drives the upsert.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedCourse {
    #[serde(rename = "ref")]
    pub external_ref: String,
    pub name: String,
    pub hippodrome: String,
    pub race_date: NaiveDateTime,
    pub distance_m: i32,
    pub discipline: String,
    pub status: String,
    #[serde(default)]
    pub runners: Vec<FeedRunner>,
}

/// HTTP client for the upstream racing data feed
///
/// Unconfigured deployments get an empty programme instead of an error, so
/// the sync loop idles quietly in development.
pub struct FeedClient {
    api_url: Option<String>,
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            api_url: config.feed_api_url.clone(),
            client,
        }
    }

    /// Whether a feed endpoint is configured
    pub fn is_active(&self) -> bool {
        self.api_url.is_some()
    }

    /// Race programme between two dates inclusive, with runners and odds
    pub async fn programme(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<FeedCourse>> {
        let api_url = match &self.api_url {
            Some(url) => url,
            None => {
                debug!("data feed not configured, returning empty programme");
                return Ok(Vec::new());
            }
        };

        let response = self
            .client
            .get(format!("{}/programme", api_url))
            .query(&[("from", from.to_string()), ("to", to.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "data feed rejected programme request");
            return Err(AppError::ExternalService(format!(
                "Data feed returned {}",
                status
            )));
        }

        let courses: Vec<FeedCourse> = response.json().await?;
        Ok(courses)
    }
}
