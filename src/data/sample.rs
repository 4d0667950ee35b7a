//! Count observations and payload decoding.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SyncError;

/// One observation of the tracked count at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSample {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
}

impl CountSample {
    pub fn new(timestamp: DateTime<Utc>, count: u64) -> Self {
        Self { timestamp, count }
    }

    /// Decode a snapshot or push payload.
    ///
    /// Payloads without a `timestamp` are stamped with `received_at`; a
    /// timestamp that is present must parse.
    pub fn from_payload(value: &Value, received_at: DateTime<Utc>) -> Result<Self, SyncError> {
        let count = parse_count(value)?;
        let timestamp = match value.get("timestamp") {
            None | Some(Value::Null) => received_at,
            Some(raw) => parse_timestamp_value(raw)?,
        };
        Ok(Self { timestamp, count })
    }

    /// Decode one entry of the history endpoint. The timestamp is mandatory.
    pub fn from_history_entry(value: &Value) -> Result<Self, SyncError> {
        let count = parse_count(value)?;
        let raw = value
            .get("timestamp")
            .filter(|v| !v.is_null())
            .ok_or_else(|| SyncError::MalformedPayload("missing timestamp".to_string()))?;
        Ok(Self {
            timestamp: parse_timestamp_value(raw)?,
            count,
        })
    }

    /// Decode a raw text frame from the push channel.
    pub fn from_frame(text: &str, received_at: DateTime<Utc>) -> Result<Self, SyncError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SyncError::MalformedPayload(format!("invalid JSON: {}", e)))?;
        Self::from_payload(&value, received_at)
    }
}

fn parse_count(value: &Value) -> Result<u64, SyncError> {
    let raw = value
        .get("count")
        .ok_or_else(|| SyncError::MalformedPayload("missing count".to_string()))?;

    if let Some(count) = raw.as_u64() {
        return Ok(count);
    }
    if raw.as_i64().is_some_and(|n| n < 0) || raw.as_f64().is_some_and(|n| n < 0.0) {
        return Err(SyncError::MalformedPayload(format!("negative count: {}", raw)));
    }
    Err(SyncError::MalformedPayload(format!("non-integer count: {}", raw)))
}

fn parse_timestamp_value(raw: &Value) -> Result<DateTime<Utc>, SyncError> {
    let text = raw
        .as_str()
        .ok_or_else(|| SyncError::MalformedPayload(format!("timestamp is not a string: {}", raw)))?;
    parse_timestamp(text)
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset as well as naive date-times (no offset),
/// which are taken to be UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, SyncError> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| SyncError::MalformedPayload(format!("unparseable timestamp: {}", text)))
}
