//! Deterministic engine harness.
//!
//! Couples a [`SyncEngine`] to a [`MockTransport`] and a [`ManualClock`]
//! so timer-driven behavior runs without sleeping.

use crate::fixtures::schema_line;
use sdds_sync_engine::{
    Clock, EngineEvent, ManualClock, MockTransport, SyncConfig, SyncEngine, TransportEvent,
};
use sdds_tree::{NodeId, ObserverId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

const MAX_STEPS: usize = 10_000;

/// A sync engine under test.
pub struct EngineHarness {
    /// The engine.
    pub engine: SyncEngine<MockTransport, ManualClock>,
    /// Shared handle to the engine's clock.
    pub clock: ManualClock,
    events: Receiver<EngineEvent>,
}

impl EngineHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: SyncConfig) -> Self {
        let clock = ManualClock::new();
        let mut engine = SyncEngine::with_clock(config, MockTransport::new(), clock.clone());
        let events = engine.subscribe();
        Self {
            engine,
            clock,
            events,
        }
    }

    /// Opens the transport, loads `document` and settles all timers.
    ///
    /// Lines sent during setup are discarded.
    pub fn connected(document: &str) -> Self {
        let mut harness = Self::new();
        harness.open();
        harness.load_schema(document);
        harness.advance_ms(100);
        harness.take_sent();
        harness
    }

    /// Signals that the transport opened.
    pub fn open(&mut self) {
        self.engine.handle_event(TransportEvent::Opened);
    }

    /// Signals a reconnect, then a fresh open.
    pub fn reconnect(&mut self) {
        self.engine.handle_event(TransportEvent::Reconnecting);
        self.engine.handle_event(TransportEvent::Opened);
    }

    /// Delivers a schema document.
    pub fn load_schema(&mut self, document: &str) {
        self.deliver(&schema_line(document));
    }

    /// Delivers one inbound line.
    pub fn deliver(&mut self, line: &str) {
        self.engine.handle_event(TransportEvent::Message(line.to_string()));
    }

    /// Moves time forward, running every deadline that falls inside the window.
    pub fn advance(&mut self, by: Duration) {
        let target = self.clock.now() + by;
        self.engine.poll();
        for _ in 0..MAX_STEPS {
            match self.engine.next_deadline() {
                Some(at) if at <= target => {
                    let now = self.clock.now();
                    if at > now {
                        self.clock.advance(at - now);
                    }
                    self.engine.poll();
                }
                _ => break,
            }
        }
        let now = self.clock.now();
        if target > now {
            self.clock.advance(target - now);
        }
    }

    /// [`advance`](Self::advance) in milliseconds.
    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Returns and clears the lines sent so far.
    pub fn take_sent(&mut self) -> Vec<String> {
        self.engine.transport_mut().take_sent()
    }

    /// Returns the engine events received so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.try_iter().collect()
    }

    /// Resolves a path, panicking if it does not exist.
    pub fn node(&self, path: &str) -> NodeId {
        self.engine
            .resolve(path)
            .unwrap_or_else(|_| panic!("no node at {path}"))
    }

    /// Adds a consumer observer that ignores notifications.
    pub fn observe(&mut self, path: &str) -> (NodeId, ObserverId) {
        let node = self.node(path);
        let id = self
            .engine
            .observe(node, Box::new(|_| {}))
            .expect("observer on live node");
        (node, id)
    }

    /// Adds a consumer observer recording every display value it sees.
    pub fn record(&mut self, path: &str) -> Rc<RefCell<Vec<String>>> {
        let node = self.node(path);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        self.engine
            .observe(node, Box::new(move |n| sink.borrow_mut().push(n.display_value())))
            .expect("observer on live node");
        seen
    }

    /// Removes a consumer observer.
    pub fn unobserve(&mut self, handle: (NodeId, ObserverId)) -> bool {
        self.engine.unobserve(handle.0, handle.1)
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::NESTED_SCHEMA;
    use sdds_sync_engine::ServerStatus;

    #[test]
    fn connected_harness_is_quiet() {
        let mut h = EngineHarness::connected(NESTED_SCHEMA);
        assert_eq!(h.engine.status(), ServerStatus::Connected);
        h.advance_ms(10_000);
        assert!(h.take_sent().is_empty());
    }

    #[test]
    fn advance_runs_intermediate_deadlines() {
        let mut h = EngineHarness::new();
        h.open();
        h.advance_ms(6_000);
        assert_eq!(h.take_sent(), ["T", "T", "T", "T"]);
    }

    #[test]
    fn observe_links_struct() {
        let mut h = EngineHarness::connected(NESTED_SCHEMA);
        let seen = h.record("sub.x");
        h.advance_ms(100);
        assert_eq!(h.take_sent(), ["L 1 sub"]);
        h.deliver("l 1 0 [8]");
        assert_eq!(*seen.borrow(), ["8"]);
        assert!(h.events().iter().any(|e| matches!(e, EngineEvent::SchemaRebuilt { nodes: 2 })));
    }
}
