//! CLI error type.

use sdds_sync_engine::SyncError;
use thiserror::Error;

/// Errors that end a CLI session.
#[derive(Error, Debug)]
pub enum CliError {
    /// Socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The device ended the session.
    #[error("session ended by device: {0}")]
    Fatal(String),

    /// The leaf refused the value.
    #[error("value {value} rejected by {path}")]
    Rejected {
        /// Leaf path.
        path: String,
        /// Rejected value.
        value: String,
    },
}
