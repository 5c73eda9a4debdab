//! Generated field values

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt;

/// Text layout for timestamp values: ISO-8601, UTC, millisecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One generated value
///
/// Timestamps are held as instants; they become text only when a document
/// is serialized for a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// JSON form used by both sinks
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Int(v) => JsonValue::from(*v),
            FieldValue::Long(v) => JsonValue::from(*v),
            FieldValue::Float(v) => JsonValue::from(*v),
            FieldValue::Double(v) => JsonValue::from(*v),
            FieldValue::Str(v) => JsonValue::from(v.as_str()),
            FieldValue::Bool(v) => JsonValue::from(*v),
            FieldValue::Timestamp(v) => JsonValue::from(format_timestamp(v)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Render an instant as `yyyy-MM-ddTHH:mm:ss.SSSZ`
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Timestamp(v) => write!(f, "{}", format_timestamp(v)),
        }
    }
}
