//! Error types for the sync engine.

use sdds_sync_protocol::ProtocolError;
use sdds_tree::TreeError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A line could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Tree construction or addressing failed.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// No node lives at the given path.
    #[error("no node at path {0:?}")]
    UnknownPath(String),

    /// The device refused another subscriber.
    #[error("subscriber limit reached: {0}")]
    SubscriberLimit(String),

    /// Not connected.
    #[error("not connected to device")]
    NotConnected,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::NotConnected => true,
            _ => false,
        }
    }
}
