//! Connection loop driving the engine.
//!
//! The engine is single-threaded, so everything runs on the current task:
//! socket reads, queued writes and engine timers are multiplexed with
//! `tokio::select!`.

use crate::commands::{Command, Engine, Step};
use crate::error::CliError;
use crate::transport::TcpLineTransport;
use sdds_sync_engine::{EngineEvent, SyncConfig, SyncEngine, TransportEvent};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Connection settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Device address, `host:port`.
    pub host: String,
    /// Delay before reconnecting after a drop.
    pub reconnect: Duration,
}

/// Runs `command` against the device until it finishes or Ctrl-C.
pub async fn run(
    config: SyncConfig,
    options: SessionOptions,
    mut command: Box<dyn Command>,
) -> Result<(), CliError> {
    let (transport, mut outgoing) = TcpLineTransport::new();
    let closed = transport.close_handle();
    let mut engine = SyncEngine::new(config, transport);
    let events = engine.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let stream = tokio::select! {
            result = TcpStream::connect(&options.host) => result,
            _ = &mut ctrl_c => return Ok(()),
        };
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!(host = %options.host, error = %err, "connect failed");
                tokio::select! {
                    _ = sleep(options.reconnect) => continue,
                    _ = &mut ctrl_c => return Ok(()),
                }
            }
        };
        info!(host = %options.host, "connected");

        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        engine.handle_event(TransportEvent::Opened);

        loop {
            if dispatch(&mut engine, &events, command.as_mut())? == Step::Done {
                flush(&mut outgoing, &mut writer).await?;
                return Ok(());
            }
            if closed.get() {
                return Ok(());
            }

            let deadline = engine.next_deadline().map(Instant::from_std);
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => engine.handle_event(TransportEvent::Message(line)),
                    Ok(None) => {
                        info!("device closed the connection");
                        break;
                    }
                    Err(err) => {
                        engine.handle_event(TransportEvent::Error(err.to_string()));
                        break;
                    }
                },
                Some(line) = outgoing.recv() => {
                    if let Err(err) = write_line(&mut writer, &line).await {
                        engine.handle_event(TransportEvent::Error(err.to_string()));
                        break;
                    }
                }
                _ = wait_until(deadline) => engine.poll(),
                _ = &mut ctrl_c => {
                    engine.handle_event(TransportEvent::Closed);
                    return Ok(());
                }
            }
        }

        engine.handle_event(TransportEvent::Reconnecting);
        // Lines queued for the dead socket are stale after the relink.
        while outgoing.try_recv().is_ok() {}
        tokio::select! {
            _ = sleep(options.reconnect) => {}
            _ = &mut ctrl_c => return Ok(()),
        }
    }
}

/// Forwards pending engine events to the command.
fn dispatch(
    engine: &mut Engine,
    events: &Receiver<EngineEvent>,
    command: &mut dyn Command,
) -> Result<Step, CliError> {
    for event in events.try_iter() {
        if let EngineEvent::Fatal(message) = &event {
            return Err(CliError::Fatal(message.clone()));
        }
        if command.on_event(engine, &event)? == Step::Done {
            return Ok(Step::Done);
        }
    }
    Ok(Step::Continue)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    debug!(line, "send");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

async fn flush(
    outgoing: &mut UnboundedReceiver<String>,
    writer: &mut OwnedWriteHalf,
) -> Result<(), CliError> {
    while let Ok(line) = outgoing.try_recv() {
        write_line(writer, &line).await?;
    }
    writer.flush().await?;
    Ok(())
}
