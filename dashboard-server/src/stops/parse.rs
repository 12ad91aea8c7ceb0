//! Lenient positional parsing of GTFS delimited text.
//!
//! Rows are read by column position rather than header name. A row that is
//! too short is skipped, and a bad number becomes zero instead of failing the
//! file.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use super::model::StopRecord;

/// Fewest fields a `stops.txt` row needs: id, name, lat, lon.
const MIN_STOP_FIELDS: usize = 4;

/// A data row with lenient accessors.
pub struct Row<'a>(&'a StringRecord);

impl Row<'_> {
    /// Field at `index` with surrounding quotes removed, or `None` when the
    /// row is shorter or the field is empty.
    pub fn text(&self, index: usize) -> Option<String> {
        let field = self.0.get(index)?.trim_matches('"');
        (!field.is_empty()).then(|| field.to_string())
    }

    /// Numeric field at `index`; missing or unparseable values read as `0.0`.
    pub fn number(&self, index: usize) -> f64 {
        self.0
            .get(index)
            .and_then(|f| f.trim_matches('"').trim().parse().ok())
            .unwrap_or(0.0)
    }
}

/// Parse comma-separated text with a header row.
///
/// The header is discarded. Blank rows, rows with fewer than `min_fields`
/// fields, and rows the CSV reader rejects are skipped with a warning.
pub fn parse_delimited<R, T, F>(reader: R, min_fields: usize, mut map: F) -> Vec<T>
where
    R: Read,
    F: FnMut(&Row<'_>) -> T,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) if e.is_io_error() => {
                warn!(error = %e, "stopped reading delimited text");
                break;
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable row");
                continue;
            }
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() < min_fields {
            warn!(line, fields = record.len(), "skipping row with insufficient fields");
            continue;
        }

        rows.push(map(&Row(&record)));
    }

    debug!(rows = rows.len(), "parsed delimited text");
    rows
}

/// Parse GTFS `stops.txt`.
///
/// Columns are positional: id, name, lat, lon, desc, location type, parent
/// station, wheelchair boarding, vehicle type, platform code.
pub fn parse_stops<R: Read>(reader: R) -> Vec<StopRecord> {
    parse_delimited(reader, MIN_STOP_FIELDS, |row| StopRecord {
        stop_id: row.text(0).unwrap_or_default(),
        stop_name: row.text(1).unwrap_or_default(),
        stop_lat: row.number(2),
        stop_lon: row.number(3),
        stop_desc: row.text(4),
        location_type: row.text(5),
        parent_station: row.text(6),
        wheelchair_boarding: row.text(7),
        vehicle_type: row.text(8),
        platform_code: row.text(9),
    })
}
