//! HTTP route handlers.

use std::path::Path;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header::InvalidHeaderValue},
    response::IntoResponse,
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, warn};

use crate::bikes::{Coordinate, Snapshot, StationFilter};
use crate::departures::{DepartureQuery, DeparturesError};
use crate::stops::{StopRecord, StopsError};

use super::dto::*;
use super::state::AppState;

/// Stops answered per multi-stop request; extra ids are ignored.
const MAX_STOPS_PER_REQUEST: usize = 10;

/// Create the application router.
///
/// `static_dir`, if given, is served under `/static`.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/bike-data", get(bike_data))
        .route("/api/bus-departures", get(bus_departures))
        .route("/api/bus-departures-multiple", get(bus_departures_multiple))
        .route("/api/bus-departures-by-name", get(bus_departures_by_name))
        .route("/api/stops/search", get(search_stops))
        .route("/api/stops/all", get(all_stops))
        .route("/api/stops/platforms", get(stop_platforms))
        .route("/api/bergen-temp", get(bergen_temp));

    let router = match static_dir {
        Some(dir) => router.nest_service("/static", ServeDir::new(dir)),
        None => router,
    };

    router.with_state(state)
}

/// CORS policy letting the frontend at `origin` call the API.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods([Method::GET])
        .allow_headers(Any))
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn require(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest {
            message: format!("{name} is required"),
        });
    }
    Ok(())
}

/// Current bike snapshot, optionally filtered.
async fn bike_data(
    State(state): State<AppState>,
    Query(req): Query<BikeDataRequest>,
) -> Json<Snapshot> {
    let mut filter = StationFilter::default();
    if let Some(min_bikes) = req.min_bikes {
        filter = filter.with_min_bikes(min_bikes);
    }
    if let (Some(lat), Some(lon), Some(radius_km)) = (req.lat, req.lon, req.radius_km) {
        filter = filter.with_radius(Coordinate::new(lat, lon), radius_km);
    }

    Json(filter.apply(state.bikes.get()))
}

/// Map a stop id to the stop place Entur expects.
///
/// Quays are looked up in the stop table and replaced by their parent;
/// anything else is passed through.
async fn resolve_stop_place(state: &AppState, stop_id: &str) -> Result<String, AppError> {
    if !StopRecord::is_quay_id(stop_id) {
        return Ok(stop_id.to_string());
    }

    state
        .stops
        .find_by_id(stop_id)
        .await?
        .and_then(|stop| stop.parent_station)
        .ok_or_else(|| AppError::NotFound {
            message: format!("No parent stop place found for {stop_id}"),
        })
}

/// Board request for a stop place, with any window or count overrides.
fn departure_query(
    stop_place_id: &str,
    time_range: Option<u32>,
    number_of_departures: Option<u32>,
) -> DepartureQuery {
    let mut query = DepartureQuery::new(stop_place_id);
    if let Some(secs) = time_range {
        query = query.with_time_range(secs);
    }
    if let Some(n) = number_of_departures {
        query = query.with_number_of_departures(n);
    }
    query
}

/// Departure board for one stop.
async fn bus_departures(
    State(state): State<AppState>,
    Query(req): Query<DeparturesRequest>,
) -> Result<Json<DeparturesResponse>, AppError> {
    require(&req.stop_id, "stopId")?;

    let stop_place_id = resolve_stop_place(&state, &req.stop_id).await?;
    let query = departure_query(&stop_place_id, req.time_range, req.number_of_departures);
    let board = state.departures.stop_place_departures(&query).await?;

    Ok(Json(DeparturesResponse {
        original_stop_id: req.stop_id,
        stop_place_id,
        data: Value::clone(&board),
        requested_at: now(),
    }))
}

async fn stop_departures(state: &AppState, query: DepartureQuery) -> StopDepartures {
    let stop_id = query.stop_place_id.clone();
    match state.departures.stop_place_departures(&query).await {
        Ok(board) => StopDepartures {
            stop_id,
            success: true,
            data: Some(Value::clone(&board)),
            error: None,
        },
        Err(e) => {
            warn!(stop_id = %stop_id, error = %e, "departure lookup failed");
            StopDepartures {
                stop_id,
                success: false,
                data: None,
                error: Some(e.to_string()),
            }
        }
    }
}

fn parse_param(name: &str, value: &str) -> Result<u32, AppError> {
    value.trim().parse().map_err(|_| AppError::BadRequest {
        message: format!("{name} must be a non-negative integer"),
    })
}

/// Departure boards for several stops; each stop succeeds or fails alone.
///
/// `requestedStops` counts every `stopIds` value sent; blank ids are not
/// queried.
async fn bus_departures_multiple(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<MultipleDeparturesResponse>, AppError> {
    let mut stop_ids = Vec::new();
    let mut time_range = None;
    let mut number_of_departures = None;

    for (key, value) in params {
        match key.as_str() {
            "stopIds" => stop_ids.push(value),
            "timeRange" => time_range = Some(parse_param("timeRange", &value)?),
            "numberOfDepartures" => {
                number_of_departures = Some(parse_param("numberOfDepartures", &value)?);
            }
            _ => {}
        }
    }

    let requested_stops = stop_ids.len();
    let queries: Vec<DepartureQuery> = stop_ids
        .iter()
        .filter(|id| !id.trim().is_empty())
        .take(MAX_STOPS_PER_REQUEST)
        .map(|id| departure_query(id, time_range, number_of_departures))
        .collect();

    if queries.is_empty() {
        return Err(AppError::BadRequest {
            message: "At least one stopIds value is required".to_string(),
        });
    }

    let results = join_all(queries.into_iter().map(|q| stop_departures(&state, q))).await;

    Ok(Json(MultipleDeparturesResponse {
        requested_stops,
        processed_stops: results.len(),
        results,
        requested_at: now(),
    }))
}

/// Departure board for the first stop whose name matches.
async fn bus_departures_by_name(
    State(state): State<AppState>,
    Query(req): Query<DeparturesByNameRequest>,
) -> Result<Json<DeparturesByNameResponse>, AppError> {
    require(&req.stop_name, "stopName")?;

    let matches = state.stops.search_by_name(&req.stop_name).await?;
    let Some(first) = matches.first() else {
        return Err(AppError::NotFound {
            message: format!("No stops found matching '{}'", req.stop_name),
        });
    };

    let stop_place_id = first.stop_place_id().to_string();
    let query = departure_query(&stop_place_id, req.time_range, req.number_of_departures);
    let board = state.departures.stop_place_departures(&query).await?;

    Ok(Json(DeparturesByNameResponse {
        stop_place_id,
        original_stop_id: first.stop_id.clone(),
        stop_name: first.stop_name.clone(),
        matching_stops_count: matches.len(),
        data: Value::clone(&board),
        requested_at: now(),
    }))
}

async fn search_stops(
    State(state): State<AppState>,
    Query(req): Query<StopSearchRequest>,
) -> Result<Json<StopSearchResponse>, AppError> {
    require(&req.query, "query")?;

    let stops: Vec<StopSummary> = state
        .stops
        .search_by_name(&req.query)
        .await?
        .into_iter()
        .map(StopSummary::from)
        .collect();

    Ok(Json(StopSearchResponse {
        search_term: req.query,
        total_results: stops.len(),
        stops,
    }))
}

async fn all_stops(State(state): State<AppState>) -> Result<Json<AllStopsResponse>, AppError> {
    let stops: Vec<StopListing> = state
        .stops
        .all()
        .await?
        .into_iter()
        .map(StopListing::from)
        .collect();

    Ok(Json(AllStopsResponse {
        total_stops: stops.len(),
        stops,
    }))
}

/// Matching stops grouped by stop place.
async fn stop_platforms(
    State(state): State<AppState>,
    Query(req): Query<StopNameRequest>,
) -> Result<Json<PlatformsResponse>, AppError> {
    require(&req.stop_name, "stopName")?;

    let matches = state.stops.search_by_name(&req.stop_name).await?;
    if matches.is_empty() {
        return Err(AppError::NotFound {
            message: format!("No stops found matching '{}'", req.stop_name),
        });
    }

    let total_stops = matches.len();
    Ok(Json(PlatformsResponse {
        search_term: req.stop_name,
        total_stops,
        stop_groups: group_platforms(matches),
    }))
}

/// MET Norway forecast, passed through as-is.
async fn bergen_temp(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    match state.weather.forecast().await {
        Ok(forecast) => Ok(Json(Value::clone(&forecast))),
        Err(e) => {
            error!(error = %e, "weather fetch failed");
            Err(AppError::Internal {
                message: "Failed to fetch".to_string(),
            })
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// An upstream service could not be reached
    Unavailable { message: String },
    Internal { message: String },
}

impl From<DeparturesError> for AppError {
    fn from(e: DeparturesError) -> Self {
        match e {
            DeparturesError::StopPlaceNotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
            _ if e.is_unavailable() => {
                error!(error = %e, "Entur request failed");
                AppError::Unavailable {
                    message: "Entur API unavailable".to_string(),
                }
            }
            _ => {
                error!(error = %e, "unexpected Entur response");
                AppError::Internal {
                    message: "Failed to fetch departures".to_string(),
                }
            }
        }
    }
}

impl From<StopsError> for AppError {
    fn from(e: StopsError) -> Self {
        error!(error = %e, "stop lookup failed");
        AppError::Internal {
            message: "Stop lookup failed".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
