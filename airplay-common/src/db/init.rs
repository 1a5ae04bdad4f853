//! Database initialization
//!
//! Opens the SQLite pool and declares the ledger schema:
//! - `channels`, `performers`: append-only dictionaries unique by name
//! - `songs`: unique by (name, performer_id)
//! - `plays`: unique by (channel_id, start_us); `end_us > start_us` is
//!   validated by the recorder, not by storage

use crate::config::DatabasePoolConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path, pool_config: &DatabasePoolConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set through connect options apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(pool_config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(pool_config.max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all ledger tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_channels_table(pool).await?;
    create_performers_table(pool).await?;
    create_songs_table(pool).await?;
    create_plays_table(pool).await?;

    info!("Database schema ready (channels, performers, songs, plays)");
    Ok(())
}

/// Drop all ledger tables, dependents first
pub async fn drop_schema(pool: &SqlitePool) -> Result<()> {
    for table in ["plays", "songs", "performers", "channels"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    info!("Dropped ledger schema");
    Ok(())
}

/// Drop and recreate the schema, discarding all data
pub async fn recreate_schema(pool: &SqlitePool) -> Result<()> {
    drop_schema(pool).await?;
    create_schema(pool).await
}

async fn create_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_performers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            performer_id INTEGER NOT NULL REFERENCES performers(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (name, performer_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_plays_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plays (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id INTEGER NOT NULL REFERENCES channels(id),
            song_id INTEGER NOT NULL REFERENCES songs(id),
            start_us INTEGER NOT NULL,
            end_us INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (channel_id, start_us)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Song history and weekly aggregation both filter on start time
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_plays_song_start ON plays(song_id, start_us)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_plays_start ON plays(start_us)")
        .execute(pool)
        .await?;

    Ok(())
}
