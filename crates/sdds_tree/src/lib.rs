//! # SDDS Tree
//!
//! Typed, self-describing value tree mirrored from a remote device.
//!
//! This crate provides:
//! - `TypeCode`, `NodeOptions` and the node variants (number, enum, string, struct)
//! - `Tree`, an arena of `ValueNode`s addressed by stable `NodeId` handles
//! - `ObserverRegistry`, the per-node change callbacks
//! - Schema parsing from the compact and the verbose descriptor encodings
//!
//! ## Key Invariants
//!
//! - Every node has exactly one owner: its parent struct, or the tree for the root
//! - A node's `idx` equals its position in the parent's child list
//! - Number values are always finite; enum values always index their labels
//! - Struct nodes are never assigned a scalar
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod node;
mod observer;
mod schema;
mod tree;
mod types;

pub use error::{TreeError, TreeResult};
pub use node::{NodeId, NodeValue, ValueNode};
pub use observer::{ObserverFn, ObserverId, ObserverRegistry};
pub use schema::{Descriptor, EnumSource, SchemaDocument};
pub use tree::{join_path, join_path_with, Interest, Tree, PATH_SEP};
pub use types::{BaseType, NodeKind, NodeOptions, ShowMode, TypeCode};
