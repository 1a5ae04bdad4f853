//! # Airplay Common Library
//!
//! Shared code for the airplay ledger service including:
//! - Entity models (channels, performers, songs, plays, chart rows)
//! - Schema creation and connection pool setup
//! - Configuration loading
//! - Timestamp parsing and storage conversion

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
