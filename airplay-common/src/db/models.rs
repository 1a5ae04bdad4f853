//! Database models
//!
//! Storage rows carry foreign keys only; the in-memory `Song` and `Play`
//! values embed their resolved references so callers can render names
//! without further lookups.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted natural-key name (matches the `VARCHAR(250)` heritage columns)
pub const MAX_NAME_LEN: usize = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performer {
    pub id: i64,
    pub name: String,
}

/// Song record; unique per (name, performer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub performer: Performer,
}

/// One broadcast of a song on a channel during `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub id: i64,
    pub channel: Channel,
    pub song: Song,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Input for recording a play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlay {
    pub title: String,
    pub performer: String,
    pub channel: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl NewPlay {
    /// Reject malformed plays before any storage call
    pub fn validate(&self) -> Result<()> {
        validate_name("title", &self.title)?;
        validate_name("performer", &self.performer)?;
        validate_name("channel", &self.channel)?;
        validate_window(&self.start, &self.end)
    }
}

/// One row of a weekly chart
///
/// `rank` and `previous_rank` are 0-based indexes (rank number minus one).
/// The `previous_*` fields are `None` when the song did not play in the
/// previous window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub performer: String,
    pub title: String,
    pub plays: i64,
    pub previous_plays: Option<i64>,
    pub rank: i64,
    pub previous_rank: Option<i64>,
}

/// Natural keys must be non-blank and fit the column
pub fn validate_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "{} exceeds {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Half-open windows must have `end > start`
pub fn validate_window(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::InvalidInput(format!(
            "end ({}) must be after start ({})",
            end, start
        )));
    }
    Ok(())
}
