//! Application state for the web layer.

use std::sync::Arc;

use crate::bikes::SnapshotCache;
use crate::cache::{CachedEnturClient, CachedWeatherClient};
use crate::stops::StopStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Latest merged bike station snapshot
    pub bikes: Arc<SnapshotCache>,

    /// Cached Entur client
    pub departures: Arc<CachedEnturClient>,

    /// Cached MET Norway client
    pub weather: Arc<CachedWeatherClient>,

    pub stops: StopStore,
}

impl AppState {
    pub fn new(
        bikes: Arc<SnapshotCache>,
        departures: CachedEnturClient,
        weather: CachedWeatherClient,
        stops: StopStore,
    ) -> Self {
        Self {
            bikes,
            departures: Arc::new(departures),
            weather: Arc::new(weather),
            stops,
        }
    }
}
