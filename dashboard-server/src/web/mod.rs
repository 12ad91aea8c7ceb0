//! Web layer for the dashboard.
//!
//! JSON endpoints for bike availability, bus departures, stop lookup and
//! weather.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, cors_layer, create_router};
pub use state::AppState;
