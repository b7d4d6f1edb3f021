//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while parsing an inbound line.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line does not match `<cmd> <port> <rest>`.
    #[error("malformed line: {0:?}")]
    Malformed(String),

    /// The command letter is not part of the protocol.
    #[error("unknown command {0:?}")]
    UnknownCommand(char),

    /// The port does not fit the port range.
    #[error("invalid port {0:?}")]
    InvalidPort(String),

    /// A link payload is not `<firstIndex> <values>`.
    #[error("invalid link payload on port {port}: {payload:?}")]
    InvalidLinkPayload {
        /// Port of the value update.
        port: u32,
        /// The raw payload.
        payload: String,
    },

    /// The value list of a link payload is not a JSON array.
    #[error("invalid value list on port {port}: {source}")]
    InvalidValues {
        /// Port of the value update.
        port: u32,
        /// Decoding failure.
        source: serde_json::Error,
    },

    /// An error payload is not `<code> <message>`.
    #[error("invalid error payload: {0:?}")]
    InvalidErrorPayload(String),
}

impl ProtocolError {
    /// Port of a value update whose payload could not be decoded.
    pub fn link_port(&self) -> Option<u32> {
        match self {
            ProtocolError::InvalidLinkPayload { port, .. }
            | ProtocolError::InvalidValues { port, .. } => Some(*port),
            _ => None,
        }
    }
}
