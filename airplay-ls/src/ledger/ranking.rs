//! Weekly chart: top-N songs across a channel set, with last week's position
//!
//! Two adjacent half-open windows on play start time:
//! - current  = `[anchor, anchor + 7d)`
//! - previous = `[anchor - 7d, anchor)`
//!
//! Each window is a grouped count per song, ordered by count descending with
//! song id ascending as tie-break. Ordinals (1, 2, 3, ...) are assigned while
//! iterating that order; equal counts never share a rank. The current window
//! is cut to the limit before joining, the previous window is ranked in full
//! so a song's prior position is known even if it was outside last week's
//! top N. Ranks leave this module as 0-based indexes.

use airplay_common::db::{validate_name, ChartEntry};
use airplay_common::time::to_micros;
use airplay_common::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Length of a chart window
pub fn chart_period() -> Duration {
    Duration::days(7)
}

/// Half-open interval `[start, end)` on play start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ChartWindow {
    /// The week starting at `anchor`
    pub fn current(anchor: DateTime<Utc>) -> Result<Self> {
        let end = anchor
            .checked_add_signed(chart_period())
            .ok_or_else(|| out_of_range(anchor))?;
        Ok(Self { start: anchor, end })
    }

    /// The week ending at `anchor`
    pub fn previous(anchor: DateTime<Utc>) -> Result<Self> {
        let start = anchor
            .checked_sub_signed(chart_period())
            .ok_or_else(|| out_of_range(anchor))?;
        Ok(Self { start, end: anchor })
    }
}

fn out_of_range(anchor: DateTime<Utc>) -> Error {
    Error::InvalidInput(format!(
        "chart anchor {} is too close to the limits of the supported date range",
        anchor
    ))
}

/// Reject a zero-length chart
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
}

/// Play count of one song within a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongCount {
    pub song_id: i64,
    pub plays: i64,
}

/// A song's position within one window (`rank` is 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedSong {
    pub song_id: i64,
    pub plays: i64,
    pub rank: i64,
}

/// Current-window position joined with the previous window (1-based ranks)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRow {
    pub song_id: i64,
    pub plays: i64,
    pub previous_plays: Option<i64>,
    pub rank: i64,
    pub previous_rank: Option<i64>,
}

/// Order counts (plays desc, song id asc) and number them from 1
pub fn rank_counts(mut counts: Vec<SongCount>) -> Vec<RankedSong> {
    counts.sort_by(|a, b| b.plays.cmp(&a.plays).then(a.song_id.cmp(&b.song_id)));

    counts
        .into_iter()
        .zip(1..)
        .map(|(count, rank)| RankedSong {
            song_id: count.song_id,
            plays: count.plays,
            rank,
        })
        .collect()
}

/// Left join of the first `limit` current songs onto the previous ranking
pub fn join_previous(current: &[RankedSong], previous: &[RankedSong], limit: usize) -> Vec<ChartRow> {
    let previous: HashMap<i64, &RankedSong> =
        previous.iter().map(|ranked| (ranked.song_id, ranked)).collect();

    current
        .iter()
        .take(limit)
        .map(|ranked| {
            let before = previous.get(&ranked.song_id);
            ChartRow {
                song_id: ranked.song_id,
                plays: ranked.plays,
                previous_plays: before.map(|b| b.plays),
                rank: ranked.rank,
                previous_rank: before.map(|b| b.rank),
            }
        })
        .collect()
}

/// Validate and deduplicate the requested channel names
fn channel_set(channels: &[String]) -> Result<BTreeSet<&str>> {
    channels
        .iter()
        .map(|name| validate_name("channel", name).map(|_| name.as_str()))
        .collect()
}

/// Grouped play counts per song for plays on `channels` starting in `window`
///
/// Rows come back ordered by count descending, song id ascending, cut to
/// `limit` when given.
async fn count_plays(
    conn: &mut SqliteConnection,
    channels: &BTreeSet<&str>,
    window: ChartWindow,
    limit: Option<usize>,
) -> Result<Vec<SongCount>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT pl.song_id, COUNT(*) AS plays \
         FROM plays pl JOIN channels c ON c.id = pl.channel_id \
         WHERE pl.start_us >= ",
    );
    query.push_bind(to_micros(&window.start));
    query.push(" AND pl.start_us < ");
    query.push_bind(to_micros(&window.end));
    query.push(" AND c.name IN (");
    {
        let mut names = query.separated(", ");
        for channel in channels {
            names.push_bind(*channel);
        }
    }
    query.push(") GROUP BY pl.song_id ORDER BY plays DESC, pl.song_id ASC");
    if let Some(limit) = limit {
        query.push(" LIMIT ");
        query.push_bind(limit as i64);
    }

    let rows: Vec<(i64, i64)> = query.build_query_as().fetch_all(&mut *conn).await?;

    Ok(rows
        .into_iter()
        .map(|(song_id, plays)| SongCount { song_id, plays })
        .collect())
}

/// (title, performer name) for each song id
async fn song_labels(
    conn: &mut SqliteConnection,
    song_ids: &[i64],
) -> Result<HashMap<i64, (String, String)>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT s.id, s.name, p.name \
         FROM songs s JOIN performers p ON p.id = s.performer_id \
         WHERE s.id IN (",
    );
    {
        let mut ids = query.separated(", ");
        for id in song_ids {
            ids.push_bind(*id);
        }
    }
    query.push(")");

    let rows: Vec<(i64, String, String)> = query.build_query_as().fetch_all(&mut *conn).await?;

    Ok(rows
        .into_iter()
        .map(|(id, title, performer)| (id, (title, performer)))
        .collect())
}

/// Top `limit` songs on `channels` for the week starting at `anchor`
///
/// An empty channel set, or a week without plays, yields an empty chart.
/// Fewer than `limit` songs yield fewer rows.
pub async fn top_songs(
    conn: &mut SqliteConnection,
    channels: &[String],
    anchor: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ChartEntry>> {
    validate_limit(limit)?;
    let current_week = ChartWindow::current(anchor)?;
    let previous_week = ChartWindow::previous(anchor)?;

    let channels = channel_set(channels)?;
    if channels.is_empty() {
        return Ok(Vec::new());
    }

    let current = rank_counts(count_plays(conn, &channels, current_week, Some(limit)).await?);
    if current.is_empty() {
        debug!("No plays on {:?} in week starting {}", channels, anchor);
        return Ok(Vec::new());
    }

    let previous = rank_counts(count_plays(conn, &channels, previous_week, None).await?);

    let rows = join_previous(&current, &previous, limit);
    let song_ids: Vec<i64> = rows.iter().map(|row| row.song_id).collect();
    let labels = song_labels(conn, &song_ids).await?;

    debug!(
        "Chart for week starting {}: {} current songs, {} previous songs",
        anchor,
        rows.len(),
        previous.len()
    );

    rows.into_iter()
        .map(|row| {
            let (title, performer) = labels.get(&row.song_id).ok_or_else(|| {
                Error::Internal(format!("Song {} missing while building chart", row.song_id))
            })?;

            Ok(ChartEntry {
                performer: performer.clone(),
                title: title.clone(),
                plays: row.plays,
                previous_plays: row.previous_plays,
                rank: row.rank - 1,
                previous_rank: row.previous_rank.map(|rank| rank - 1),
            })
        })
        .collect()
}
