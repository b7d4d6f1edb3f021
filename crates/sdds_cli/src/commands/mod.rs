//! CLI command implementations.
//!
//! Each command reacts to engine events from the session loop and tells
//! it when to stop.

pub mod dump;
pub mod set;
pub mod watch;

use crate::error::CliError;
use crate::transport::TcpLineTransport;
use sdds_sync_engine::{EngineEvent, SyncEngine};

/// Engine driven by the CLI session.
pub type Engine = SyncEngine<TcpLineTransport>;

/// What the session loop does after a command handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep running.
    Continue,
    /// Flush pending output and exit.
    Done,
}

/// A command driven by engine events.
pub trait Command {
    /// Handles one engine event.
    fn on_event(&mut self, engine: &mut Engine, event: &EngineEvent) -> Result<Step, CliError>;
}
