//! GTFS transit stops.
//!
//! Stops are imported once from the static GTFS feed into a SQLite table and
//! then serve name search and quay → stop place resolution.

mod error;
mod import;
mod model;
mod parse;
mod store;

pub use error::StopsError;
pub use import::{GtfsImporter, ImportConfig, ImportOutcome, extract_entry};
pub use model::{QUAY_PREFIX, StopRecord};
pub use parse::{Row, parse_delimited, parse_stops};
pub use store::StopStore;
