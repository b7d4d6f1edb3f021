//! # SDDS Sync Protocol
//!
//! Line protocol spoken between the sync engine and a remote device.
//!
//! This crate provides:
//! - `InboundMessage` parsing (`t`, `l`, `u`, `E`, `B` lines)
//! - `OutboundMessage` encoding (`T`, `L`, `U` and `path=value` lines)
//! - `ErrorCode` for device-reported protocol errors
//!
//! Every line is self-contained; framing is left to the transport.
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{ErrorCode, InboundMessage, OutboundMessage};
