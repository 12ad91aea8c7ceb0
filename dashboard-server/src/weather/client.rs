//! MET Norway locationforecast client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0";

/// Bergen city centre.
const DEFAULT_LATITUDE: f64 = 60.3913;
const DEFAULT_LONGITUDE: f64 = 5.3221;

/// Errors from the weather API.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {message}")]
    Json { message: String },
}

/// Configuration for the weather client.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    /// MET Norway rejects requests without an identifying User-Agent
    pub user_agent: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WeatherConfig {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: user_agent.into(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            timeout_secs: 30,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the compact locationforecast at one fixed location.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    url: String,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent).map_err(|_| WeatherError::Api {
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
            url: forecast_url(&config),
        })
    }

    /// Fetch the current forecast document.
    pub async fn forecast(&self) -> Result<Value, WeatherError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| WeatherError::Json {
            message: e.to_string(),
        })
    }
}

/// MET Norway asks for at most four decimals in coordinates.
fn forecast_url(config: &WeatherConfig) -> String {
    format!(
        "{}/compact?lat={:.4}&lon={:.4}",
        config.base_url.trim_end_matches('/'),
        config.latitude,
        config.longitude
    )
}
