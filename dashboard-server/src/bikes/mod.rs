//! Bike-share station data.
//!
//! Two GBFS feeds (live `station_status` and static `station_information`)
//! are fetched together every minute, joined on `station_id`, and published
//! as one snapshot that request handlers read.

mod client;
mod error;
mod filter;
mod merge;
mod refresh;
mod snapshot;
mod value;

pub use client::{GbfsClient, GbfsConfig, StationFeed};
pub use error::FeedError;
pub use filter::{Coordinate, StationFilter};
pub use merge::merge_stations;
pub use refresh::{DEFAULT_REFRESH_INTERVAL, LoopState, RefreshLoop};
pub use snapshot::{Snapshot, SnapshotCache};
pub use value::{FieldValue, StationRecord};
