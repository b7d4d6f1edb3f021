//! Transport abstraction for the line protocol.

use crate::error::{SyncError, SyncResult};

/// A byte-stream connection carrying one protocol line per message.
///
/// Incoming traffic is not read through this trait; the host feeds
/// [`TransportEvent`]s into the engine as they happen.
pub trait Transport {
    /// Sends one protocol line, without terminator.
    fn send(&mut self, line: &str) -> SyncResult<()>;

    /// Closes the connection and stops any automatic reconnect.
    fn close(&mut self) -> SyncResult<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, line: &str) -> SyncResult<()> {
        (**self).send(line)
    }

    fn close(&mut self) -> SyncResult<()> {
        (**self).close()
    }
}

/// Something that happened on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is up.
    Opened,
    /// One complete protocol line arrived.
    Message(String),
    /// The connection dropped and a reconnect is in progress.
    Reconnecting,
    /// The connection is closed for good.
    Closed,
    /// A transport-level failure was reported.
    Error(String),
}

/// A transport that records outbound lines for tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<String>,
    closed: bool,
    fail_sends: bool,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines sent so far.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Returns and clears the lines sent so far.
    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }

    /// Returns true once `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Makes every following send fail with a retryable error.
    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }
}

impl Transport for MockTransport {
    fn send(&mut self, line: &str) -> SyncResult<()> {
        if self.closed {
            return Err(SyncError::NotConnected);
        }
        if self.fail_sends {
            return Err(SyncError::transport_retryable("mock send failure"));
        }
        self.sent.push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> SyncResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_lines() {
        let mut transport = MockTransport::new();
        transport.send("T").unwrap();
        transport.send("L 1 sub").unwrap();
        assert_eq!(transport.sent(), ["T", "L 1 sub"]);
        assert_eq!(transport.take_sent().len(), 2);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn mock_failures() {
        let mut transport = MockTransport::new();
        transport.set_fail_sends(true);
        assert!(transport.send("T").unwrap_err().is_retryable());

        transport.set_fail_sends(false);
        transport.close().unwrap();
        assert!(transport.is_closed());
        assert!(matches!(transport.send("T"), Err(SyncError::NotConnected)));
    }
}
