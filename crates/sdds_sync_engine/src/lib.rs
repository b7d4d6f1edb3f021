//! # SDDS Sync Engine
//!
//! Mirrors a tree of typed values living on a remote device over one
//! narrow line-based connection.
//!
//! This crate provides:
//! - `ConnectionPool`: subscription slots multiplexed onto numeric ports
//! - Round-robin, throttled link/unlink scheduling
//! - `SyncEngine`: schema rebuilds, value updates and local edit propagation
//! - Transport and clock abstractions, with `MockTransport` and `ManualClock` for tests
//!
//! ## Architecture
//!
//! The engine is single threaded and event driven. The host calls
//! `handle_event` for every transport event and `poll` whenever
//! `next_deadline` has passed. Consumers express interest by observing
//! leaves; the engine reconciles the pool with that interest after a short
//! debounce and sends at most one link/unlink request per scheduler tick.
//!
//! ## Key Invariants
//!
//! - A slot's port is its table index plus the configured base
//! - Only `close` slots are recycled for new subscriptions
//! - Applying inbound values never produces outbound edits
//! - Nothing is written to the transport unless the status is `connected`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod engine;
mod error;
mod pool;
mod timer;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use engine::{EngineEvent, ServerStatus, SyncEngine, ROOT_NAME};
pub use error::{SyncError, SyncResult};
pub use pool::{ConnectionPool, ConnectionSlot, SlotTask};
pub use timer::{TimerKind, Timers};
pub use transport::{MockTransport, Transport, TransportEvent};
