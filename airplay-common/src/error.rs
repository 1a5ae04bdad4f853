//! Common error types for the airplay ledger

use thiserror::Error;

/// Common result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the ledger and its HTTP layer
///
/// Duplicate-key conflicts have no variant: the resolver and the play
/// recorder convert them into `Existing` / no-op outcomes.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage failure during a read or write (wraps sqlx::Error).
    /// The enclosing transaction is rolled back when this propagates.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid argument, rejected before any storage call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal invariant violated
    #[error("Internal error: {0}")]
    Internal(String),
}
