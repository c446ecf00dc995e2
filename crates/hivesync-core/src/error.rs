//! Error types for hivesync core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.

use thiserror::Error;

/// Result type alias for hivesync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for hivesync.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the table-format transaction
    #[error("Iceberg error: {0}")]
    Iceberg(#[from] IcebergError),

    /// Rewrite lifecycle error
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the underlying table-format transaction.
///
/// These are passed through the rewrite coordinator unchanged.
#[derive(Error, Debug)]
pub enum IcebergError {
    /// The snapshot named by `validate_from_snapshot` does not exist
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(i64),

    /// Validation against the base snapshot failed (concurrent modification)
    #[error("Validation conflict: {0}")]
    ValidationConflict(String),

    /// Snapshot commit failed
    #[error("Snapshot commit failed: {0}")]
    CommitFailed(String),

    /// Commit called on a transaction that already committed
    #[error("Transaction already committed")]
    AlreadyCommitted,

    /// Generic Iceberg error
    #[error("Iceberg error: {0}")]
    Other(String),
}

/// Errors raised by the rewrite coordinator itself.
#[derive(Error, Debug)]
pub enum RewriteError {
    /// An operation was attempted in a state that does not allow it
    #[error("Cannot {operation} while rewrite is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::hive::RewriteState,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
