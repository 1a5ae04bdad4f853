//! Play recorder
//!
//! Resolves the channel and song (creating them on first reference) and
//! inserts the play. A second play with the same channel and start instant
//! is a no-op: the unique `(channel_id, start_us)` conflict rolls back the
//! play's savepoint only and the call reports `None`.

use super::resolver::{insert_in_savepoint, resolve_channel, resolve_song, InsertOutcome};
use airplay_common::db::{NewPlay, Play};
use airplay_common::time::to_micros;
use airplay_common::Result;
use sqlx::SqliteConnection;
use tracing::debug;

/// Record a play within the caller's transaction
///
/// Returns the created play, or `None` when a play already starts at the
/// same instant on the same channel. Channels, performers and songs resolved
/// along the way stay in the transaction in both cases.
pub async fn record_play(conn: &mut SqliteConnection, new_play: &NewPlay) -> Result<Option<Play>> {
    new_play.validate()?;

    let channel = resolve_channel(conn, &new_play.channel).await?.into_inner();
    let song = resolve_song(conn, &new_play.title, &new_play.performer)
        .await?
        .into_inner();

    let insert = sqlx::query(
        "INSERT INTO plays (channel_id, song_id, start_us, end_us) VALUES (?, ?, ?, ?)",
    )
    .bind(channel.id)
    .bind(song.id)
    .bind(to_micros(&new_play.start))
    .bind(to_micros(&new_play.end));

    match insert_in_savepoint(conn, insert).await? {
        InsertOutcome::Inserted(id) => {
            debug!(
                "Recorded play {}: '{}' by '{}' on '{}' at {}",
                id, song.name, song.performer.name, channel.name, new_play.start
            );
            Ok(Some(Play {
                id,
                channel,
                song,
                start: new_play.start,
                end: new_play.end,
            }))
        }
        InsertOutcome::Duplicate => {
            debug!(
                "Play on '{}' at {} already recorded, ignoring",
                channel.name, new_play.start
            );
            Ok(None)
        }
    }
}
