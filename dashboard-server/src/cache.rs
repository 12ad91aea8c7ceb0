//! Caching layer for upstream API responses.
//!
//! Departure boards and weather forecasts are requested by every dashboard
//! that is open. Caching them for a short TTL keeps us well inside the
//! providers' fair-use limits while staying effectively real-time.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use serde_json::Value;

use crate::departures::{DepartureQuery, DeparturesError, EnturClient};
use crate::weather::{WeatherClient, WeatherError};

/// Cached departure board: the raw `stopPlace` object.
type BoardEntry = Arc<Value>;

/// Configuration for the response caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for departure boards.
    pub departures_ttl: Duration,

    /// TTL for the weather forecast.
    pub weather_ttl: Duration,

    /// Maximum number of cached departure boards.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            departures_ttl: Duration::from_secs(30),
            weather_ttl: Duration::from_secs(5 * 60),
            max_capacity: 1000,
        }
    }
}

/// Entur client with caching.
///
/// Boards are keyed by the full query, so different windows or departure
/// counts never share an entry.
pub struct CachedEnturClient {
    client: EnturClient,
    boards: MokaCache<DepartureQuery, BoardEntry>,
}

impl CachedEnturClient {
    pub fn new(client: EnturClient, config: &CacheConfig) -> Self {
        let boards = MokaCache::builder()
            .time_to_live(config.departures_ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { client, boards }
    }

    /// Get a departure board, using the cache if available.
    ///
    /// Errors are not cached.
    pub async fn stop_place_departures(
        &self,
        query: &DepartureQuery,
    ) -> Result<BoardEntry, DeparturesError> {
        if let Some(cached) = self.boards.get(query).await {
            return Ok(cached);
        }

        let board = Arc::new(self.client.stop_place_departures(query).await?);
        self.boards.insert(query.clone(), board.clone()).await;

        Ok(board)
    }
}

#[cfg(test)]
impl CachedEnturClient {
    /// Put a board in the cache as if it had been fetched.
    pub(crate) async fn seed(&self, query: DepartureQuery, board: Value) {
        self.boards.insert(query, Arc::new(board)).await;
    }
}

/// Weather client with caching.
pub struct CachedWeatherClient {
    client: WeatherClient,
    forecast: MokaCache<(), Arc<Value>>,
}

impl CachedWeatherClient {
    pub fn new(client: WeatherClient, config: &CacheConfig) -> Self {
        let forecast = MokaCache::builder()
            .time_to_live(config.weather_ttl)
            .max_capacity(1)
            .build();

        Self { client, forecast }
    }

    /// Get the forecast, using the cache if available.
    pub async fn forecast(&self) -> Result<Arc<Value>, WeatherError> {
        if let Some(cached) = self.forecast.get(&()).await {
            return Ok(cached);
        }

        let forecast = Arc::new(self.client.forecast().await?);
        self.forecast.insert((), forecast.clone()).await;

        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::departures::EnturConfig;
    use crate::weather::WeatherConfig;

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.departures_ttl, Duration::from_secs(30));
        assert_eq!(config.weather_ttl, Duration::from_secs(300));
        assert_eq!(config.max_capacity, 1000);
    }

    #[tokio::test]
    async fn cached_board_is_served_without_a_request() {
        // Unroutable endpoint: a cache miss would fail
        let client = EnturClient::new(
            EnturConfig::new("test-app").with_endpoint("http://127.0.0.1:9/graphql"),
        )
        .unwrap();
        let cached = CachedEnturClient::new(client, &CacheConfig::default());

        let query = DepartureQuery::new("NSR:StopPlace:30000");
        let board = Arc::new(serde_json::json!({"id": "NSR:StopPlace:30000"}));
        cached.boards.insert(query.clone(), board.clone()).await;

        let served = cached.stop_place_departures(&query).await.unwrap();
        assert_eq!(served, board);

        let other = query.clone().with_number_of_departures(20);
        assert!(cached.stop_place_departures(&other).await.is_err());
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let client = EnturClient::new(
            EnturConfig::new("test-app").with_endpoint("http://127.0.0.1:9/graphql"),
        )
        .unwrap();
        let cached = CachedEnturClient::new(client, &CacheConfig::default());

        let query = DepartureQuery::new("NSR:StopPlace:30000");
        assert!(cached.stop_place_departures(&query).await.is_err());

        cached.boards.run_pending_tasks().await;
        assert_eq!(cached.boards.entry_count(), 0);
    }

    #[tokio::test]
    async fn cached_forecast_is_served_without_a_request() {
        let client =
            WeatherClient::new(WeatherConfig::new("test-app").with_base_url("http://127.0.0.1:9"))
                .unwrap();
        let cached = CachedWeatherClient::new(client, &CacheConfig::default());

        assert!(cached.forecast().await.is_err());

        let forecast = Arc::new(serde_json::json!({"type": "Feature"}));
        cached.forecast.insert((), forecast.clone()).await;
        assert_eq!(cached.forecast().await.unwrap(), forecast);
    }
}
