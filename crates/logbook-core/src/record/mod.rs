//! Raw journal records.
//!
//! A [`RawRecord`] is one JSON object read from the journal stream. It keeps
//! the original field order (serde_json is built with `preserve_order`) so
//! that records which cannot be typed can be re-serialized exactly as they
//! arrived, minus the `event`/`timestamp` envelope.
//!
//! Typed extraction goes through [`Fields`], see [`access`].

pub mod access;

pub use access::{FieldError, Fields};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ErrorCode;

/// Key holding the type tag of every journal record.
pub const TAG_KEY: &str = "event";

/// Key holding the ISO-8601 UTC timestamp of every journal record.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Errors for lines that cannot be attributed to any event kind.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The line is not valid JSON.
    #[error("line is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The line is JSON but not an object.
    #[error("record is not a JSON object")]
    NotAnObject,
    /// The object has no string `event` key.
    #[error("record has no string `event` tag")]
    MissingTag,
}

impl RecordError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::UnreadableRecord
    }
}

/// One journal record: a type tag, a timestamp and the ordered field map.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    tag: String,
    timestamp: Option<DateTime<Utc>>,
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Parse a single journal line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the line is not a JSON object carrying a
    /// string `event` tag. A missing or unparseable timestamp is *not* an
    /// error here; see [`RawRecord::timestamp`].
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line.trim())?;
        Self::from_value(value)
    }

    /// Build a record from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the value is not an object with a string
    /// `event` tag.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(fields) = value else {
            return Err(RecordError::NotAnObject);
        };
        Self::from_map(fields)
    }

    /// Build a record from an ordered field map.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingTag`] when `event` is absent or not a
    /// string.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self, RecordError> {
        let tag = fields
            .get(TAG_KEY)
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingTag)?
            .to_string();
        let timestamp = fields
            .get(TIMESTAMP_KEY)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        Ok(Self {
            tag,
            timestamp,
            fields,
        })
    }

    /// The raw `event` tag, exactly as written (case-sensitive).
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The record timestamp, or `None` when it was missing or unparseable.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Typed accessor over all fields of the record.
    #[must_use]
    pub const fn fields(&self) -> Fields<'_> {
        Fields::new(&self.fields)
    }

    /// The full ordered field map, envelope included.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The fields minus the `event`/`timestamp` envelope, in original order.
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| key.as_str() != TAG_KEY && key.as_str() != TIMESTAMP_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Parse a journal timestamp (`2023-01-01T00:00:00Z`).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
