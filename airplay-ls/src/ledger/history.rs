//! Play history queries
//!
//! A play `[p.start, p.end)` matches a query window `[start, end)` when the
//! two half-open intervals overlap: `p.start < end AND p.end > start`.
//! Touching intervals do not overlap.

use airplay_common::db::{validate_name, validate_window, Channel, Performer, Play, Song};
use airplay_common::time::{from_micros, to_micros};
use airplay_common::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Columns shared by both history queries
const PLAY_COLUMNS: &str = r#"
    SELECT pl.id AS play_id, pl.start_us, pl.end_us,
           c.id AS channel_id, c.name AS channel_name,
           s.id AS song_id, s.name AS song_name,
           pf.id AS performer_id, pf.name AS performer_name
    FROM plays pl
    JOIN channels c ON c.id = pl.channel_id
    JOIN songs s ON s.id = pl.song_id
    JOIN performers pf ON pf.id = s.performer_id
"#;

/// Plays of a song by a performer overlapping `[start, end)`, by start time
pub async fn song_plays(
    conn: &mut SqliteConnection,
    title: &str,
    performer: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<Vec<Play>> {
    validate_name("title", title)?;
    validate_name("performer", performer)?;
    validate_window(start, end)?;

    let sql = format!(
        "{} WHERE s.name = ? AND pf.name = ? AND pl.start_us < ? AND pl.end_us > ? \
         ORDER BY pl.start_us, pl.id",
        PLAY_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(title)
        .bind(performer)
        .bind(to_micros(end))
        .bind(to_micros(start))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(play_from_row).collect()
}

/// Plays on a channel overlapping `[start, end)`, by (start, end)
pub async fn channel_plays(
    conn: &mut SqliteConnection,
    channel: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<Vec<Play>> {
    validate_name("channel", channel)?;
    validate_window(start, end)?;

    let sql = format!(
        "{} WHERE c.name = ? AND pl.start_us < ? AND pl.end_us > ? \
         ORDER BY pl.start_us, pl.end_us",
        PLAY_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(channel)
        .bind(to_micros(end))
        .bind(to_micros(start))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(play_from_row).collect()
}

fn play_from_row(row: &SqliteRow) -> Result<Play> {
    Ok(Play {
        id: row.get("play_id"),
        channel: Channel {
            id: row.get("channel_id"),
            name: row.get("channel_name"),
        },
        song: Song {
            id: row.get("song_id"),
            name: row.get("song_name"),
            performer: Performer {
                id: row.get("performer_id"),
                name: row.get("performer_name"),
            },
        },
        start: from_micros(row.get("start_us"))?,
        end: from_micros(row.get("end_us"))?,
    })
}
