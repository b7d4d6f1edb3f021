//! Engine transport backed by a TCP connection task.

use sdds_sync_engine::{SyncError, SyncResult, Transport};
use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Hands outbound lines to the session loop, which owns the socket.
#[derive(Debug)]
pub struct TcpLineTransport {
    outgoing: mpsc::UnboundedSender<String>,
    closed: Rc<Cell<bool>>,
}

impl TcpLineTransport {
    /// Creates the transport and the receiving end of its line queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            outgoing: tx,
            closed: Rc::new(Cell::new(false)),
        };
        (transport, rx)
    }

    /// Flag set once the engine closes the transport.
    pub fn close_handle(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }
}

impl Transport for TcpLineTransport {
    fn send(&mut self, line: &str) -> SyncResult<()> {
        if self.closed.get() {
            return Err(SyncError::NotConnected);
        }
        self.outgoing
            .send(line.to_string())
            .map_err(|_| SyncError::transport_fatal("connection task gone"))
    }

    fn close(&mut self) -> SyncResult<()> {
        self.closed.set(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_queued_until_close() {
        let (mut transport, mut rx) = TcpLineTransport::new();
        let closed = transport.close_handle();
        transport.send("T").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "T");

        transport.close().unwrap();
        assert!(closed.get());
        assert!(matches!(transport.send("T"), Err(SyncError::NotConnected)));
    }
}
