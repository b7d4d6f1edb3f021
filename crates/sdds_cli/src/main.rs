//! SDDS CLI
//!
//! Mirrors the value tree of a remote device over a TCP line connection.
//!
//! # Commands
//!
//! - `dump` - Print the device's tree once the schema arrives
//! - `watch` - Print every value change under a struct
//! - `set` - Assign one leaf and exit

mod commands;
mod error;
mod session;
mod transport;

use clap::{Parser, Subcommand};
use sdds_sync_engine::SyncConfig;
use session::SessionOptions;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// SDDS remote value tree client.
#[derive(Parser)]
#[command(name = "sdds")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Device address
    #[arg(global = true, long, default_value = "127.0.0.1:8080")]
    host: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Delay that coalesces observer changes, in milliseconds
    #[arg(global = true, long, default_value_t = 100)]
    debounce_ms: u64,

    /// Delay between link/unlink requests, in milliseconds
    #[arg(global = true, long, default_value_t = 1000)]
    scheduler_ms: u64,

    /// Schema re-request interval, in milliseconds
    #[arg(global = true, long, default_value_t = 2000)]
    schema_retry_ms: u64,

    /// Delay before reconnecting a dropped connection, in milliseconds
    #[arg(global = true, long, default_value_t = 1000)]
    reconnect_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tree once the schema arrives
    Dump,

    /// Print value changes of every leaf under a struct
    Watch {
        /// Dotted path of a struct or leaf
        path: String,
    },

    /// Assign a leaf and exit
    Set {
        /// Dotted path of the leaf
        path: String,

        /// New value (JSON, or plain text)
        value: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = SyncConfig::new()
        .with_activation_debounce(Duration::from_millis(cli.debounce_ms))
        .with_scheduler_interval(Duration::from_millis(cli.scheduler_ms))
        .with_schema_retry_interval(Duration::from_millis(cli.schema_retry_ms));
    let options = SessionOptions {
        host: cli.host,
        reconnect: Duration::from_millis(cli.reconnect_ms),
    };

    let command: Box<dyn commands::Command> = match cli.command {
        Commands::Dump => Box::new(commands::dump::Dump),
        Commands::Watch { path } => Box::new(commands::watch::Watch::new(path)),
        Commands::Set { path, value } => Box::new(commands::set::Set::new(path, &value)),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session::run(config, options, command))?;

    Ok(())
}
