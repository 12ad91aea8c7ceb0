//! GBFS feed client.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use super::error::FeedError;

/// Default GBFS base URL (Bergen Bysykkel).
const DEFAULT_BASE_URL: &str = "https://gbfs.urbansharing.com/bergenbysykkel.no";

const STATUS_FEED: &str = "station_status";
const INFORMATION_FEED: &str = "station_information";

/// Source of the two station feeds the refresh loop merges.
pub trait StationFeed: Send + Sync {
    /// Live per-station status objects.
    fn station_status(&self) -> impl Future<Output = Result<Vec<Value>, FeedError>> + Send;

    /// Static per-station information objects.
    fn station_information(&self) -> impl Future<Output = Result<Vec<Value>, FeedError>> + Send;
}

/// Configuration for the GBFS client.
#[derive(Debug, Clone)]
pub struct GbfsConfig {
    /// Base URL; feeds are fetched from `{base_url}/{feed}.json`
    pub base_url: String,
    /// Client-identifying User-Agent; providers may reject anonymous clients
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GbfsConfig {
    /// Create a new config with the given User-Agent.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: user_agent.into(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for a GBFS system.
#[derive(Debug, Clone)]
pub struct GbfsClient {
    http: reqwest::Client,
    base_url: String,
}

impl GbfsClient {
    /// Create a new GBFS client.
    pub fn new(config: GbfsConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent).map_err(|_| FeedError::Api {
            status: 0,
            message: "Invalid User-Agent".to_string(),
        })?;
        headers.insert(USER_AGENT, agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one feed and return its `data.stations` array.
    async fn fetch_stations(&self, feed: &'static str) -> Result<Vec<Value>, FeedError> {
        let url = format!("{}/{}.json", self.base_url, feed);

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        extract_stations(&body, feed)
    }
}

impl StationFeed for GbfsClient {
    async fn station_status(&self) -> Result<Vec<Value>, FeedError> {
        self.fetch_stations(STATUS_FEED).await
    }

    async fn station_information(&self) -> Result<Vec<Value>, FeedError> {
        self.fetch_stations(INFORMATION_FEED).await
    }
}

/// Pull the `data.stations` array out of a GBFS document.
pub(crate) fn extract_stations(body: &str, feed: &'static str) -> Result<Vec<Value>, FeedError> {
    let mut document: Value = serde_json::from_str(body).map_err(|e| FeedError::Json {
        message: e.to_string(),
    })?;

    match document.pointer_mut("/data/stations").map(Value::take) {
        Some(Value::Array(stations)) => Ok(stations),
        _ => Err(FeedError::MissingStations { feed }),
    }
}
