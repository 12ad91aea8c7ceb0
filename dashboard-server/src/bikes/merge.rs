//! Join of live station status with static station information.

use serde_json::{Map, Value};

use super::error::FeedError;
use super::snapshot::Snapshot;
use super::value::{FieldValue, StationRecord};

const STATION_ID: &str = "station_id";

/// Merge status stations with their information records.
///
/// The status array drives the output: one record per status station, in
/// order. Information fields are copied first and status fields on top, so
/// live values win on collision. A station only present in the information
/// feed contributes nothing.
///
/// The lookup is a linear scan taking the first information record with a
/// matching `station_id` (O(n·m)). Feeds hold a few hundred stations.
///
/// Every status entry, and every information entry the scan passes, must be
/// an object with a string `station_id`; anything else fails the merge.
pub fn merge_stations(status: &[Value], information: &[Value]) -> Result<Snapshot, FeedError> {
    status
        .iter()
        .map(|station| {
            let station = as_station(station, "status")?;
            let id = station_id(station, "status")?;

            let mut record = StationRecord::with_capacity(station.len());
            if let Some(info) = find_information(information, id)? {
                copy_fields(&mut record, info);
            }
            copy_fields(&mut record, station);

            Ok(record)
        })
        .collect()
}

fn as_station<'a>(
    station: &'a Value,
    feed: &str,
) -> Result<&'a Map<String, Value>, FeedError> {
    station.as_object().ok_or_else(|| FeedError::Json {
        message: format!("{feed} station is not an object: {station}"),
    })
}

fn station_id<'a>(station: &'a Map<String, Value>, feed: &str) -> Result<&'a str, FeedError> {
    station
        .get(STATION_ID)
        .and_then(Value::as_str)
        .ok_or_else(|| FeedError::Json {
            message: format!("{feed} station has no string station_id: {station:?}"),
        })
}

fn find_information<'a>(
    information: &'a [Value],
    id: &str,
) -> Result<Option<&'a Map<String, Value>>, FeedError> {
    for info in information {
        let info = as_station(info, "information")?;
        if station_id(info, "information")? == id {
            return Ok(Some(info));
        }
    }
    Ok(None)
}

fn copy_fields(record: &mut StationRecord, source: &Map<String, Value>) {
    for (name, value) in source {
        record.insert(name.clone(), FieldValue::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(fields: &[(&str, FieldValue)]) -> StationRecord {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn merges_matching_station() {
        let status = vec![json!({"station_id": "A", "num_bikes_available": 3})];
        let info = vec![json!({"station_id": "A", "name": "Torget"})];

        let merged = merge_stations(&status, &info).unwrap();

        assert_eq!(
            merged,
            vec![record(&[
                ("station_id", FieldValue::Text("A".into())),
                ("num_bikes_available", FieldValue::Int(3)),
                ("name", FieldValue::Text("Torget".into())),
            ])]
        );
    }

    #[test]
    fn status_wins_on_collision() {
        let status = vec![json!({"station_id": "A", "capacity": 20})];
        let info = vec![json!({"station_id": "A", "capacity": 15, "name": "Torget"})];

        let merged = merge_stations(&status, &info).unwrap();

        assert_eq!(merged[0]["capacity"], FieldValue::Int(20));
        assert_eq!(merged[0]["name"], FieldValue::Text("Torget".into()));
    }

    #[test]
    fn unmatched_status_keeps_only_its_fields() {
        let status = vec![json!({"station_id": "B", "num_bikes_available": 1})];
        let info = vec![json!({"station_id": "A", "name": "Torget", "lat": 60.39})];

        let merged = merge_stations(&status, &info).unwrap();

        assert_eq!(
            merged,
            vec![record(&[
                ("station_id", FieldValue::Text("B".into())),
                ("num_bikes_available", FieldValue::Int(1)),
            ])]
        );
    }

    #[test]
    fn information_only_stations_are_dropped() {
        let status = vec![json!({"station_id": "A"})];
        let info = vec![
            json!({"station_id": "A", "name": "Torget"}),
            json!({"station_id": "Z", "name": "Nowhere"}),
        ];

        let merged = merge_stations(&status, &info).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn first_information_match_wins() {
        let status = vec![json!({"station_id": "A"})];
        let info = vec![
            json!({"station_id": "A", "name": "First"}),
            json!({"station_id": "A", "name": "Second"}),
        ];

        let merged = merge_stations(&status, &info).unwrap();
        assert_eq!(merged[0]["name"], FieldValue::Text("First".into()));
    }

    #[test]
    fn output_follows_status_order() {
        let status = vec![
            json!({"station_id": "C"}),
            json!({"station_id": "A"}),
            json!({"station_id": "B"}),
        ];
        let info = vec![json!({"station_id": "A"}), json!({"station_id": "B"})];

        let merged = merge_stations(&status, &info).unwrap();
        let ids: Vec<_> = merged
            .iter()
            .map(|r| r["station_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn status_without_string_id_fails_the_merge() {
        let info = vec![json!({"station_id": "A", "name": "Torget"})];

        let missing = vec![json!({"num_bikes_available": 2})];
        assert!(matches!(
            merge_stations(&missing, &info),
            Err(FeedError::Json { .. })
        ));

        let numeric = vec![json!({"station_id": 7, "num_bikes_available": 1})];
        assert!(matches!(
            merge_stations(&numeric, &info),
            Err(FeedError::Json { .. })
        ));
    }

    #[test]
    fn information_without_id_before_the_match_fails_the_merge() {
        let status = vec![json!({"station_id": "A"})];
        let info = vec![json!({"name": "no id"}), json!({"station_id": "A"})];
        assert!(merge_stations(&status, &info).is_err());

        let info = vec![json!({"station_id": "A", "name": "Torget"}), json!({"name": "no id"})];
        let merged = merge_stations(&status, &info).unwrap();
        assert_eq!(merged[0]["name"], FieldValue::Text("Torget".into()));
    }

    #[test]
    fn non_object_status_entry_fails_the_merge() {
        let status = vec![json!("A")];
        assert!(merge_stations(&status, &[]).is_err());
    }

    fn station_ids() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[A-F]", 0..12)
    }

    proptest! {
        #[test]
        fn one_record_per_status_station(status_ids in station_ids(), info_ids in station_ids()) {
            let status: Vec<Value> = status_ids
                .iter()
                .map(|id| json!({"station_id": id, "num_bikes_available": 1}))
                .collect();
            let info: Vec<Value> = info_ids
                .iter()
                .map(|id| json!({"station_id": id, "num_bikes_available": 99, "name": id}))
                .collect();

            let merged = merge_stations(&status, &info).unwrap();

            prop_assert_eq!(merged.len(), status.len());
            for (record, id) in merged.iter().zip(&status_ids) {
                prop_assert_eq!(&record["num_bikes_available"], &FieldValue::Int(1));
                prop_assert_eq!(record.contains_key("name"), info_ids.contains(id));
            }
        }
    }
}
