//! Weather forecast from MET Norway.

mod client;

pub use client::{WeatherClient, WeatherConfig, WeatherError};
