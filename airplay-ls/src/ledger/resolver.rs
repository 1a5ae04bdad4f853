//! Reference resolver: get-or-create for channels, performers and songs
//!
//! Each resolve is a natural-key lookup followed, on a miss, by an insert
//! inside a savepoint. When a concurrent writer wins the race the insert hits
//! the unique constraint; only the savepoint is rolled back and the row is
//! re-read, so callers never see a duplicate-key failure. A unique violation
//! implies the row now exists, hence a single retry is enough.

use airplay_common::db::{validate_name, Channel, Performer, Song};
use airplay_common::{Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Connection, Row, Sqlite, SqliteConnection};
use tracing::debug;

/// Outcome of a get-or-create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    /// Inserted by this call
    Created(T),
    /// Already present (found by lookup, or inserted concurrently by another writer)
    Existing(T),
}

impl<T> Resolved<T> {
    pub fn into_inner(self) -> T {
        match self {
            Resolved::Created(value) | Resolved::Existing(value) => value,
        }
    }

    pub fn get(&self) -> &T {
        match self {
            Resolved::Created(value) | Resolved::Existing(value) => value,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolved::Created(_))
    }
}

/// Outcome of an insert guarded by a savepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row inserted; carries its rowid
    Inserted(i64),
    /// Unique constraint rejected the row; the savepoint was rolled back
    Duplicate,
}

/// Run `insert` inside a savepoint of the enclosing transaction
///
/// A unique violation rolls back only the savepoint and is reported as
/// `Duplicate`. Any other error propagates; the savepoint is rolled back when
/// dropped and the caller's transaction is expected to be abandoned.
pub async fn insert_in_savepoint<'q>(
    conn: &mut SqliteConnection,
    insert: Query<'q, Sqlite, SqliteArguments<'q>>,
) -> Result<InsertOutcome> {
    let mut savepoint = conn.begin().await?;

    match insert.execute(&mut *savepoint).await {
        Ok(done) => {
            savepoint.commit().await?;
            Ok(InsertOutcome::Inserted(done.last_insert_rowid()))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            savepoint.rollback().await?;
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

/// Exact lookup of a channel by name
pub async fn find_channel(conn: &mut SqliteConnection, name: &str) -> Result<Option<Channel>> {
    let row = sqlx::query("SELECT id, name FROM channels WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Channel {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// Exact lookup of a performer by name
pub async fn find_performer(conn: &mut SqliteConnection, name: &str) -> Result<Option<Performer>> {
    let row = sqlx::query("SELECT id, name FROM performers WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Performer {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// Exact lookup of a song by (title, performer id)
async fn find_song_by_performer(
    conn: &mut SqliteConnection,
    title: &str,
    performer: &Performer,
) -> Result<Option<Song>> {
    let row = sqlx::query("SELECT id, name FROM songs WHERE name = ? AND performer_id = ?")
        .bind(title)
        .bind(performer.id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Song {
        id: row.get("id"),
        name: row.get("name"),
        performer: performer.clone(),
    }))
}

/// Exact lookup of a song by (title, performer name)
pub async fn find_song(
    conn: &mut SqliteConnection,
    title: &str,
    performer_name: &str,
) -> Result<Option<Song>> {
    let row = sqlx::query(
        r#"
        SELECT s.id AS song_id, s.name AS song_name, p.id AS performer_id, p.name AS performer_name
        FROM songs s
        JOIN performers p ON p.id = s.performer_id
        WHERE s.name = ? AND p.name = ?
        "#,
    )
    .bind(title)
    .bind(performer_name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| Song {
        id: row.get("song_id"),
        name: row.get("song_name"),
        performer: Performer {
            id: row.get("performer_id"),
            name: row.get("performer_name"),
        },
    }))
}

/// Get or create a channel by name
pub async fn resolve_channel(conn: &mut SqliteConnection, name: &str) -> Result<Resolved<Channel>> {
    validate_name("channel", name)?;

    if let Some(channel) = find_channel(conn, name).await? {
        return Ok(Resolved::Existing(channel));
    }

    let insert = sqlx::query("INSERT INTO channels (name) VALUES (?)").bind(name);
    match insert_in_savepoint(conn, insert).await? {
        InsertOutcome::Inserted(id) => {
            debug!("Created channel {} '{}'", id, name);
            Ok(Resolved::Created(Channel {
                id,
                name: name.to_string(),
            }))
        }
        InsertOutcome::Duplicate => {
            debug!("Channel '{}' created concurrently, re-reading", name);
            find_channel(conn, name)
                .await?
                .map(Resolved::Existing)
                .ok_or_else(|| vanished("channel", name))
        }
    }
}

/// Get or create a performer by name
pub async fn resolve_performer(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Resolved<Performer>> {
    validate_name("performer", name)?;

    if let Some(performer) = find_performer(conn, name).await? {
        return Ok(Resolved::Existing(performer));
    }

    let insert = sqlx::query("INSERT INTO performers (name) VALUES (?)").bind(name);
    match insert_in_savepoint(conn, insert).await? {
        InsertOutcome::Inserted(id) => {
            debug!("Created performer {} '{}'", id, name);
            Ok(Resolved::Created(Performer {
                id,
                name: name.to_string(),
            }))
        }
        InsertOutcome::Duplicate => {
            debug!("Performer '{}' created concurrently, re-reading", name);
            find_performer(conn, name)
                .await?
                .map(Resolved::Existing)
                .ok_or_else(|| vanished("performer", name))
        }
    }
}

/// Get or create a song, resolving (and possibly creating) its performer first
///
/// `Created` means the song row was inserted by this call; the performer may
/// have been created along the way either way.
pub async fn resolve_song(
    conn: &mut SqliteConnection,
    title: &str,
    performer_name: &str,
) -> Result<Resolved<Song>> {
    validate_name("title", title)?;
    validate_name("performer", performer_name)?;

    if let Some(song) = find_song(conn, title, performer_name).await? {
        return Ok(Resolved::Existing(song));
    }

    let performer = resolve_performer(conn, performer_name).await?.into_inner();

    let insert = sqlx::query("INSERT INTO songs (name, performer_id) VALUES (?, ?)")
        .bind(title)
        .bind(performer.id);
    match insert_in_savepoint(conn, insert).await? {
        InsertOutcome::Inserted(id) => {
            debug!("Created song {} '{}' by '{}'", id, title, performer.name);
            Ok(Resolved::Created(Song {
                id,
                name: title.to_string(),
                performer,
            }))
        }
        InsertOutcome::Duplicate => {
            debug!("Song '{}' by '{}' created concurrently, re-reading", title, performer.name);
            find_song_by_performer(conn, title, &performer)
                .await?
                .map(Resolved::Existing)
                .ok_or_else(|| vanished("song", title))
        }
    }
}

fn vanished(kind: &str, name: &str) -> Error {
    Error::Internal(format!(
        "{} '{}' rejected as duplicate but not found on re-read",
        kind, name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::temp_ledger;

    #[tokio::test]
    async fn test_resolve_channel_creates_then_finds() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        let first = resolve_channel(&mut *tx, "C1").await.unwrap();
        let second = resolve_channel(&mut *tx, "C1").await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.get(), second.get());
    }

    #[tokio::test]
    async fn test_resolve_song_creates_performer() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        let song = resolve_song(&mut *tx, "S1", "A1").await.unwrap();
        assert!(song.was_created());

        let performer = find_performer(&mut *tx, "A1").await.unwrap();
        assert_eq!(performer.as_ref(), Some(&song.get().performer));
    }

    #[tokio::test]
    async fn test_same_title_different_performers_are_distinct() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        let a = resolve_song(&mut *tx, "S1", "A1").await.unwrap().into_inner();
        let b = resolve_song(&mut *tx, "S1", "A2").await.unwrap().into_inner();

        assert_ne!(a.id, b.id);
        assert_ne!(a.performer.id, b.performer.id);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_absorbed_and_transaction_survives() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        let channel = resolve_channel(&mut *tx, "C1").await.unwrap().into_inner();

        // Simulate losing the race: insert without the preceding lookup
        let insert = sqlx::query("INSERT INTO channels (name) VALUES (?)").bind("C1");
        let outcome = insert_in_savepoint(&mut *tx, insert).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);

        // The outer transaction is still usable and keeps earlier writes
        let other = resolve_channel(&mut *tx, "C2").await.unwrap();
        assert!(other.was_created());
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM channels")
            .fetch_one(ledger.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let mut conn = ledger.pool().acquire().await.unwrap();
        assert_eq!(find_channel(&mut *conn, "C1").await.unwrap(), Some(channel));
    }

    #[tokio::test]
    async fn test_non_unique_failure_propagates() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        // Foreign key violation is not a duplicate
        let insert = sqlx::query("INSERT INTO songs (name, performer_id) VALUES (?, ?)")
            .bind("S1")
            .bind(999_i64);
        let result = insert_in_savepoint(&mut *tx, insert).await;

        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (_dir, ledger) = temp_ledger().await;
        let mut tx = ledger.session().await.unwrap();

        let result = resolve_channel(&mut *tx, "  ").await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
