//! Bergen dashboard server.
//!
//! Live city-bike availability, bus departures, transit stop lookup and
//! the local forecast, served as JSON for a single-page dashboard.

pub mod bikes;
pub mod cache;
pub mod config;
pub mod departures;
pub mod stops;
pub mod weather;
pub mod web;
