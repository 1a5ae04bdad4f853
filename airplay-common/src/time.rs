//! Timestamp utilities
//!
//! Instants are `DateTime<Utc>` everywhere in the ledger. The store keeps them
//! as integer microseconds since the Unix epoch so that `(channel, start)`
//! uniqueness is exact and range filters compare numerically.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Naive layouts accepted at the request boundary (interpreted as UTC)
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse ISO-8601-like text into a UTC instant
///
/// Accepts RFC 3339 (any offset), naive date-times with `T` or a space as
/// separator, and bare dates (midnight UTC).
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(instant.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    Err(Error::InvalidInput(format!("Unrecognized timestamp: '{}'", text)))
}

/// Render an instant for API output
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Storage representation of an instant
pub fn to_micros(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp_micros()
}

/// Inverse of [`to_micros`]
pub fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| Error::Internal(format!("Stored timestamp out of range: {}", micros)))
}
