//! Periodic background refresh of the bike snapshot.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::StationFeed;
use super::error::FeedError;
use super::merge::merge_stations;
use super::snapshot::SnapshotCache;

/// Default time between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Lifecycle of a refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Fetching or sleeping between cycles.
    Running,
    /// Cancellation observed; no further writes.
    Stopped,
}

/// Keeps a [`SnapshotCache`] in sync with a pair of station feeds.
///
/// A failed cycle leaves the previous snapshot in place; the next attempt is
/// simply the next interval.
pub struct RefreshLoop<F> {
    feed: F,
    cache: Arc<SnapshotCache>,
    interval: Duration,
    state: LoopState,
}

impl<F: StationFeed> RefreshLoop<F> {
    pub fn new(feed: F, cache: Arc<SnapshotCache>, interval: Duration) -> Self {
        Self {
            feed,
            cache,
            interval,
            state: LoopState::Running,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run one fetch, merge and publish cycle.
    ///
    /// Returns the number of stations published.
    pub async fn refresh_once(&self) -> Result<usize, FeedError> {
        let (status, information) =
            try_join(self.feed.station_status(), self.feed.station_information()).await?;

        let snapshot = merge_stations(&status, &information)?;
        let count = snapshot.len();
        self.cache.set(snapshot);

        Ok(count)
    }

    /// Refresh until `cancel` fires.
    ///
    /// Cancellation during a fetch drops the in-flight cycle before it
    /// publishes.
    pub async fn run(&mut self, cancel: CancellationToken) -> LoopState {
        info!(interval_secs = self.interval.as_secs(), "bike refresh loop started");

        while !cancel.is_cancelled() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.refresh_once() => match result {
                    Ok(count) => debug!(stations = count, "bike snapshot refreshed"),
                    Err(e) => warn!(error = %e, "bike refresh failed, keeping previous snapshot"),
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state = LoopState::Stopped;
        info!("bike refresh loop stopped");
        self.state
    }
}
