//! Application configuration.
//!
//! Every setting has a default suitable for local development and can be
//! overridden through an environment variable (a `.env` file is loaded first
//! if present).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::bikes::{DEFAULT_REFRESH_INTERVAL, GbfsConfig};
use crate::departures::EnturConfig;
use crate::stops::ImportConfig;
use crate::weather::WeatherConfig;

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime configuration for the dashboard server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub addr: SocketAddr,

    /// SQLite URL of the stop table
    pub database_url: String,

    /// User-Agent sent to GBFS, MET Norway and the GTFS host
    pub user_agent: String,

    /// `ET-Client-Name` sent to Entur
    pub et_client_name: String,

    /// Base URL of the GBFS system
    pub gbfs_base_url: Option<String>,

    /// URL of the GTFS archive
    pub gtfs_url: Option<String>,

    /// Where the GTFS archive is downloaded and unpacked
    pub gtfs_work_dir: PathBuf,

    /// Forecast location (latitude, longitude)
    pub weather_location: Option<(f64, f64)>,

    /// Origin allowed to call the API from a browser
    pub cors_origin: String,

    /// Pre-built frontend assets served under `/static`
    pub static_dir: Option<PathBuf>,

    /// Time between bike snapshot refreshes
    pub bike_refresh_interval: Duration,

    /// Request timeout for GBFS, Entur and MET Norway, in seconds
    pub upstream_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5049)),
            database_url: "sqlite://stops.db".to_string(),
            user_agent: "BergenApp/1.0".to_string(),
            et_client_name: "student-bergenapp".to_string(),
            gbfs_base_url: None,
            gtfs_url: None,
            gtfs_work_dir: PathBuf::from("database"),
            weather_location: None,
            cors_origin: "http://localhost:5173".to_string(),
            static_dir: None,
            bike_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            upstream_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to read variables; unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("DASHBOARD_ADDR") {
            config.addr = parse("DASHBOARD_ADDR", addr)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(agent) = lookup("USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(name) = lookup("ET_CLIENT_NAME") {
            config.et_client_name = name;
        }
        config.gbfs_base_url = lookup("GBFS_BASE_URL");
        config.gtfs_url = lookup("GTFS_URL");
        if let Some(dir) = lookup("GTFS_WORK_DIR") {
            config.gtfs_work_dir = PathBuf::from(dir);
        }
        match (lookup("WEATHER_LAT"), lookup("WEATHER_LON")) {
            (Some(lat), Some(lon)) => {
                config.weather_location =
                    Some((parse("WEATHER_LAT", lat)?, parse("WEATHER_LON", lon)?));
            }
            (None, None) => {}
            (Some(value), None) | (None, Some(value)) => {
                return Err(ConfigError {
                    var: "WEATHER_LAT/WEATHER_LON",
                    value,
                    reason: "both coordinates must be set".to_string(),
                });
            }
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            config.cors_origin = origin;
        }
        config.static_dir = lookup("STATIC_DIR").map(PathBuf::from);
        if let Some(secs) = lookup("BIKE_REFRESH_SECS") {
            let secs: u64 = parse("BIKE_REFRESH_SECS", secs)?;
            if secs == 0 {
                return Err(ConfigError {
                    var: "BIKE_REFRESH_SECS",
                    value: "0".to_string(),
                    reason: "interval must be positive".to_string(),
                });
            }
            config.bike_refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout_secs = parse("UPSTREAM_TIMEOUT_SECS", secs)?;
            if config.upstream_timeout_secs == 0 {
                return Err(ConfigError {
                    var: "UPSTREAM_TIMEOUT_SECS",
                    value: "0".to_string(),
                    reason: "timeout must be positive".to_string(),
                });
            }
        }

        Ok(config)
    }

    pub fn gbfs_config(&self) -> GbfsConfig {
        let config = GbfsConfig::new(&self.user_agent).with_timeout(self.upstream_timeout_secs);
        match &self.gbfs_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }

    pub fn entur_config(&self) -> EnturConfig {
        EnturConfig::new(&self.et_client_name).with_timeout(self.upstream_timeout_secs)
    }

    pub fn weather_config(&self) -> WeatherConfig {
        let config = WeatherConfig::new(&self.user_agent).with_timeout(self.upstream_timeout_secs);
        match self.weather_location {
            Some((lat, lon)) => config.with_location(lat, lon),
            None => config,
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        let config = ImportConfig::new(&self.user_agent).with_work_dir(&self.gtfs_work_dir);
        match &self.gtfs_url {
            Some(url) => config.with_archive_url(url),
            None => config,
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError {
        var,
        reason: e.to_string(),
        value,
    })
}
