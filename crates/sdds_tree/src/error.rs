//! Error types for the tree crate.

use crate::node::NodeId;
use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while building or addressing a value tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The schema text is not valid JSON.
    #[error("invalid schema json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The schema document is neither a descriptor list nor a `{d, e}` object.
    #[error("invalid schema document: {message}")]
    InvalidDocument {
        /// Description of the structural problem.
        message: String,
    },

    /// A single descriptor could not be normalized.
    #[error("invalid descriptor {name:?}: {reason}")]
    InvalidDescriptor {
        /// Name of the descriptor, if it could be read.
        name: String,
        /// Why the descriptor was rejected.
        reason: String,
    },

    /// The descriptor carries a type code no node variant handles.
    #[error("unknown type code 0x{code:02x} for {name:?}")]
    UnknownType {
        /// The raw type code.
        code: u8,
        /// Name of the offending descriptor.
        name: String,
    },

    /// An enum descriptor references a missing shared label list.
    #[error("enum {name:?} references unknown label list {index}")]
    UnknownEnumList {
        /// Index into the shared dictionary.
        index: usize,
        /// Name of the offending descriptor.
        name: String,
    },

    /// The handle no longer refers to a live node.
    #[error("stale node handle {0:?}")]
    StaleNode(NodeId),

    /// The operation requires a struct node.
    #[error("node {0:?} is not a struct")]
    NotAStruct(NodeId),
}

impl TreeError {
    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid descriptor error.
    pub fn invalid_descriptor(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
