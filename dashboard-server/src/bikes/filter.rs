//! Query-time filters over a bike snapshot.

use super::snapshot::Snapshot;
use super::value::StationRecord;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// Filters requested on `/api/bike-data`.
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    /// Keep stations with at least this many bikes available.
    pub min_bikes: Option<i64>,

    /// Keep stations within `radius_km` of a centre point.
    pub near: Option<(Coordinate, f64)>,
}

impl StationFilter {
    pub fn with_min_bikes(mut self, min_bikes: i64) -> Self {
        self.min_bikes = Some(min_bikes);
        self
    }

    pub fn with_radius(mut self, centre: Coordinate, radius_km: f64) -> Self {
        self.near = Some((centre, radius_km));
        self
    }

    /// Whether a station passes every configured filter.
    ///
    /// Stations missing the field a filter needs are excluded by it.
    pub fn matches(&self, station: &StationRecord) -> bool {
        if let Some(min) = self.min_bikes {
            let bikes = station
                .get("num_bikes_available")
                .and_then(|v| v.as_i64());
            if !bikes.is_some_and(|n| n >= min) {
                return false;
            }
        }

        if let Some((centre, radius_km)) = &self.near {
            let Some(position) = station_position(station) else {
                return false;
            };
            if centre.distance_km(&position) > *radius_km {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, snapshot: Snapshot) -> Snapshot {
        snapshot.into_iter().filter(|s| self.matches(s)).collect()
    }
}

fn station_position(station: &StationRecord) -> Option<Coordinate> {
    let lat = station.get("lat")?.as_f64()?;
    let lon = station.get("lon")?.as_f64()?;
    Some(Coordinate::new(lat, lon))
}
