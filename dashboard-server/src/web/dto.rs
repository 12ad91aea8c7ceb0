//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stops::StopRecord;

/// Query for `/api/bike-data`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeDataRequest {
    /// Minimum `num_bikes_available`
    pub min_bikes: Option<i64>,

    pub lat: Option<f64>,
    pub lon: Option<f64>,

    /// Only applied when `lat` and `lon` are also given
    pub radius_km: Option<f64>,
}

/// Query for `/api/bus-departures`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesRequest {
    #[serde(default)]
    pub stop_id: String,

    /// Look-ahead window in seconds
    pub time_range: Option<u32>,

    pub number_of_departures: Option<u32>,
}

/// Departure board for one requested stop.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesResponse {
    /// Id as the client sent it (may be a quay)
    pub original_stop_id: String,

    /// Stop place that was actually queried
    pub stop_place_id: String,

    /// Entur `stopPlace` object
    pub data: Value,

    pub requested_at: String,
}

/// One entry of a multi-stop request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDepartures {
    pub stop_id: String,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleDeparturesResponse {
    pub requested_stops: usize,
    pub processed_stops: usize,
    pub results: Vec<StopDepartures>,
    pub requested_at: String,
}

/// Query with a stop name fragment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopNameRequest {
    #[serde(default)]
    pub stop_name: String,
}

/// Query for `/api/bus-departures-by-name`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesByNameRequest {
    #[serde(default)]
    pub stop_name: String,

    /// Look-ahead window in seconds
    pub time_range: Option<u32>,

    pub number_of_departures: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesByNameResponse {
    pub stop_place_id: String,
    pub original_stop_id: String,
    pub stop_name: String,
    pub matching_stops_count: usize,
    pub data: Value,
    pub requested_at: String,
}

/// Query for `/api/stops/search`.
#[derive(Debug, Deserialize)]
pub struct StopSearchRequest {
    #[serde(default)]
    pub query: String,
}

/// A stop in search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSummary {
    pub stop_id: String,
    pub stop_name: String,
    pub platform_code: Option<String>,
    pub parent_station: Option<String>,
}

impl From<StopRecord> for StopSummary {
    fn from(stop: StopRecord) -> Self {
        Self {
            stop_id: stop.stop_id,
            stop_name: stop.stop_name,
            platform_code: stop.platform_code,
            parent_station: stop.parent_station,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSearchResponse {
    pub search_term: String,
    pub total_results: usize,
    pub stops: Vec<StopSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopListing {
    pub stop_id: String,
    pub stop_name: String,
    pub parent_station: Option<String>,
}

impl From<StopRecord> for StopListing {
    fn from(stop: StopRecord) -> Self {
        Self {
            stop_id: stop.stop_id,
            stop_name: stop.stop_name,
            parent_station: stop.parent_station,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStopsResponse {
    pub total_stops: usize,
    pub stops: Vec<StopListing>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub stop_id: String,
    pub stop_name: String,
    pub platform_code: Option<String>,

    /// The stop is a stop place rather than a quay
    pub is_main_stop: bool,
}

/// Stops sharing one stop place.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopGroup {
    pub main_stop_id: String,
    pub main_stop_name: String,
    pub has_multiple_platforms: bool,
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformsResponse {
    pub search_term: String,
    pub total_stops: usize,
    pub stop_groups: Vec<StopGroup>,
}

/// Group stops by stop place, keeping groups in order of first appearance.
///
/// Within a group, platforms are ordered by platform code with stops that
/// have none first.
pub fn group_platforms(stops: Vec<StopRecord>) -> Vec<StopGroup> {
    let mut groups: Vec<(String, Vec<StopRecord>)> = Vec::new();

    for stop in stops {
        let key = stop.stop_place_id().to_string();
        match groups.iter_mut().find(|(id, _)| *id == key) {
            Some((_, members)) => members.push(stop),
            None => groups.push((key, vec![stop])),
        }
    }

    groups
        .into_iter()
        .map(|(main_stop_id, mut members)| {
            let main_stop_name = members[0].stop_name.clone();
            members.sort_by(|a, b| a.platform_code.cmp(&b.platform_code));

            StopGroup {
                main_stop_id,
                main_stop_name,
                has_multiple_platforms: members.len() > 1,
                platforms: members
                    .into_iter()
                    .map(|stop| Platform {
                        is_main_stop: stop.is_stop_place(),
                        stop_id: stop.stop_id,
                        stop_name: stop.stop_name,
                        platform_code: stop.platform_code,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, name: &str, parent: Option<&str>, platform: Option<&str>) -> StopRecord {
        StopRecord {
            stop_id: id.into(),
            stop_name: name.into(),
            stop_lat: 60.39,
            stop_lon: 5.33,
            stop_desc: None,
            location_type: None,
            parent_station: parent.map(String::from),
            wheelchair_boarding: None,
            vehicle_type: None,
            platform_code: platform.map(String::from),
        }
    }

    #[test]
    fn groups_quays_under_their_stop_place() {
        let stops = vec![
            stop("NSR:Quay:2", "Festplassen", Some("NSR:StopPlace:1"), Some("B")),
            stop("NSR:StopPlace:9", "Fisketorget", None, None),
            stop("NSR:Quay:3", "Festplassen", Some("NSR:StopPlace:1"), Some("A")),
            stop("NSR:StopPlace:1", "Festplassen", None, None),
        ];

        let groups = group_platforms(stops);
        assert_eq!(groups.len(), 2);

        let festplassen = &groups[0];
        assert_eq!(festplassen.main_stop_id, "NSR:StopPlace:1");
        assert_eq!(festplassen.main_stop_name, "Festplassen");
        assert!(festplassen.has_multiple_platforms);
        let ids: Vec<_> = festplassen.platforms.iter().map(|p| p.stop_id.as_str()).collect();
        assert_eq!(ids, ["NSR:StopPlace:1", "NSR:Quay:3", "NSR:Quay:2"]);
        assert!(festplassen.platforms[0].is_main_stop);
        assert!(!festplassen.platforms[1].is_main_stop);

        let fisketorget = &groups[1];
        assert_eq!(fisketorget.main_stop_id, "NSR:StopPlace:9");
        assert!(!fisketorget.has_multiple_platforms);
    }

    #[test]
    fn group_serializes_camel_case() {
        let groups = group_platforms(vec![stop(
            "NSR:Quay:2",
            "Torget",
            Some("NSR:StopPlace:1"),
            Some("C"),
        )]);
        let json = serde_json::to_value(&groups[0]).unwrap();
        assert_eq!(json["mainStopId"], "NSR:StopPlace:1");
        assert_eq!(json["hasMultiplePlatforms"], false);
        assert_eq!(json["platforms"][0]["platformCode"], "C");
        assert_eq!(json["platforms"][0]["isMainStop"], false);
    }

    #[test]
    fn failed_stop_omits_data() {
        let result = StopDepartures {
            stop_id: "NSR:StopPlace:1".into(),
            success: false,
            data: None,
            error: Some("stop NSR:StopPlace:1 not found or inactive".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stopId"], "NSR:StopPlace:1");
        assert!(json.get("data").is_none());
    }
}
