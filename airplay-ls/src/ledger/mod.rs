//! Play ledger: the storage service behind every operation
//!
//! `Ledger` owns the connection pool and hands out one session per call.
//! Write sessions start with `BEGIN IMMEDIATE` so SQLite takes the write lock
//! up front; concurrent writers queue on `busy_timeout` instead of failing on
//! a stale snapshot. Read sessions use a plain deferred `BEGIN`. A session that
//! is dropped without `commit` is rolled back, so an abandoned or cancelled
//! request leaves nothing behind.
//!
//! The submodules expose the same operations as free functions over
//! `&mut SqliteConnection` for callers composing several steps in one
//! transaction.

pub mod history;
pub mod ranking;
pub mod recorder;
pub mod resolver;

pub use resolver::{InsertOutcome, Resolved};

use airplay_common::config::DatabasePoolConfig;
use airplay_common::db::{
    init_database, recreate_schema, validate_name, validate_window, Channel, ChartEntry, NewPlay,
    Performer, Play, Song,
};
use airplay_common::Result;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// One call's transaction scope
pub type Session = Transaction<'static, Sqlite>;

/// Explicitly constructed storage service
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open the database file, creating it and the schema if needed
    pub async fn open(db_path: &Path, pool_config: &DatabasePoolConfig) -> Result<Self> {
        let pool = init_database(db_path, pool_config).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drop every table and recreate the empty schema
    pub async fn recreate_schema(&self) -> Result<()> {
        info!("Recreating ledger schema (all plays discarded)");
        recreate_schema(&self.pool).await
    }

    /// Begin a write session holding SQLite's write lock
    pub async fn session(&self) -> Result<Session> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Begin a read-only snapshot
    pub async fn snapshot(&self) -> Result<Session> {
        Ok(self.pool.begin().await?)
    }

    pub async fn add_channel(&self, name: &str) -> Result<Channel> {
        validate_name("channel", name)?;

        let mut tx = self.session().await?;
        let channel = resolver::resolve_channel(&mut *tx, name).await?;
        tx.commit().await?;

        debug!("add_channel '{}': created={}", name, channel.was_created());
        Ok(channel.into_inner())
    }

    pub async fn add_performer(&self, name: &str) -> Result<Performer> {
        validate_name("performer", name)?;

        let mut tx = self.session().await?;
        let performer = resolver::resolve_performer(&mut *tx, name).await?;
        tx.commit().await?;

        debug!("add_performer '{}': created={}", name, performer.was_created());
        Ok(performer.into_inner())
    }

    pub async fn add_song(&self, title: &str, performer: &str) -> Result<Song> {
        validate_name("title", title)?;
        validate_name("performer", performer)?;

        let mut tx = self.session().await?;
        let song = resolver::resolve_song(&mut *tx, title, performer).await?;
        tx.commit().await?;

        debug!(
            "add_song '{}' by '{}': created={}",
            title,
            performer,
            song.was_created()
        );
        Ok(song.into_inner())
    }

    /// Record a play; `None` when the channel already has a play at that start
    pub async fn add_play(&self, new_play: &NewPlay) -> Result<Option<Play>> {
        new_play.validate()?;

        let mut tx = self.session().await?;
        let play = recorder::record_play(&mut *tx, new_play).await?;
        tx.commit().await?;

        Ok(play)
    }

    pub async fn song_plays(
        &self,
        title: &str,
        performer: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Play>> {
        validate_window(start, end)?;

        let mut tx = self.snapshot().await?;
        let plays = history::song_plays(&mut *tx, title, performer, start, end).await?;
        tx.commit().await?;

        Ok(plays)
    }

    pub async fn channel_plays(
        &self,
        channel: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Play>> {
        validate_window(start, end)?;

        let mut tx = self.snapshot().await?;
        let plays = history::channel_plays(&mut *tx, channel, start, end).await?;
        tx.commit().await?;

        Ok(plays)
    }

    /// Weekly top `limit` songs on `channels`, starting at `anchor`
    pub async fn top(
        &self,
        channels: &[String],
        anchor: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChartEntry>> {
        ranking::validate_limit(limit)?;
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.snapshot().await?;
        let chart = ranking::top_songs(&mut *tx, channels, anchor, limit).await?;
        tx.commit().await?;

        Ok(chart)
    }
}
