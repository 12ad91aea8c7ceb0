//! Dynamically-typed station attribute values.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// A flat map of station attributes, as served on `/api/bike-data`.
pub type StationRecord = HashMap<String, FieldValue>;

/// A single scalar attribute copied out of a GBFS feed.
///
/// Serializes untagged, so a record comes out as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Numeric view of the value, for filtering.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the value. Floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Null => FieldValue::Null,
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            // Nested structures (rental_uris, rental_methods) are kept as their JSON text
            Value::Array(_) | Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }
}
