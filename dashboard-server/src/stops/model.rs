//! Persisted transit stop metadata.

use serde::Serialize;

/// One row of GTFS `stops.txt`.
///
/// A quay (platform-level stop) points at its stop place through
/// `parent_station`; stop places themselves have none.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub stop_desc: Option<String>,
    pub location_type: Option<String>,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: Option<String>,
    pub vehicle_type: Option<String>,
    pub platform_code: Option<String>,
}

/// Prefix of Entur quay identifiers, e.g. `NSR:Quay:1234`.
pub const QUAY_PREFIX: &str = "NSR:Quay:";

impl StopRecord {
    pub fn is_quay_id(stop_id: &str) -> bool {
        stop_id.starts_with(QUAY_PREFIX)
    }

    /// Identifier of the stop place this stop belongs to.
    ///
    /// Falls back to the stop's own id when it has no parent.
    pub fn stop_place_id(&self) -> &str {
        self.parent_station.as_deref().unwrap_or(&self.stop_id)
    }

    pub fn is_stop_place(&self) -> bool {
        self.parent_station.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, parent: Option<&str>) -> StopRecord {
        StopRecord {
            stop_id: id.into(),
            stop_name: "Bergen busstasjon".into(),
            stop_lat: 60.39,
            stop_lon: 5.33,
            stop_desc: None,
            location_type: None,
            parent_station: parent.map(String::from),
            wheelchair_boarding: None,
            vehicle_type: None,
            platform_code: None,
        }
    }

    #[test]
    fn quay_resolves_to_parent() {
        let quay = stop("NSR:Quay:52000", Some("NSR:StopPlace:30000"));
        assert_eq!(quay.stop_place_id(), "NSR:StopPlace:30000");
        assert!(!quay.is_stop_place());
    }

    #[test]
    fn stop_place_resolves_to_itself() {
        let place = stop("NSR:StopPlace:30000", None);
        assert_eq!(place.stop_place_id(), "NSR:StopPlace:30000");
        assert!(place.is_stop_place());
    }

    #[test]
    fn quay_prefix() {
        assert!(StopRecord::is_quay_id("NSR:Quay:52000"));
        assert!(!StopRecord::is_quay_id("NSR:StopPlace:30000"));
    }
}
