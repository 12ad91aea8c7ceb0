//! Real-time departures from the Entur journey planner.

mod client;
mod error;

pub use client::{
    DEFAULT_NUMBER_OF_DEPARTURES, DEFAULT_TIME_RANGE, DepartureQuery, EnturClient, EnturConfig,
};
pub use error::DeparturesError;
