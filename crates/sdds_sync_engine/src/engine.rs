//! The sync engine.
//!
//! `SyncEngine` owns the mirrored tree and the connection pool. The host
//! feeds it transport events and calls [`SyncEngine::poll`] whenever
//! [`SyncEngine::next_deadline`] passes; everything else happens inside
//! those two entry points on the caller's thread.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::pool::ConnectionPool;
use crate::timer::{TimerKind, Timers};
use crate::transport::{Transport, TransportEvent};
use sdds_sync_protocol::{ErrorCode, InboundMessage, OutboundMessage};
use sdds_tree::{NodeId, ObserverFn, ObserverId, Tree, ValueNode};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Name of the root struct that holds the device's tree.
pub const ROOT_NAME: &str = "data";

/// Upper bound on timer callbacks run by one [`SyncEngine::poll`].
const MAX_FIRES_PER_POLL: usize = 32;

/// Connection status as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    /// No transport event seen yet.
    Created,
    /// The transport is open.
    Connected,
    /// The transport dropped and is reconnecting.
    Reconnecting,
    /// The transport is closed.
    Closed,
}

impl ServerStatus {
    /// Returns true if messages can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, ServerStatus::Connected)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerStatus::Created => "created",
            ServerStatus::Connected => "connected",
            ServerStatus::Reconnecting => "reconnecting",
            ServerStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Notifications delivered to [`SyncEngine::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The connection status changed.
    StatusChanged(ServerStatus),
    /// A schema document was applied.
    SchemaRebuilt {
        /// Number of nodes below the root.
        nodes: usize,
    },
    /// A schema document was rejected; the tree is empty.
    SchemaFailed(String),
    /// The device ended the session.
    Fatal(String),
}

/// Local edits waiting to go upstream.
///
/// Shared between the engine and the permanent per-leaf observers.
#[derive(Debug, Default)]
struct EditQueue {
    connected: Cell<bool>,
    applying_inbound: Cell<bool>,
    pending: RefCell<VecDeque<OutboundMessage>>,
}

impl EditQueue {
    fn record(&self, path: &str, node: &ValueNode) {
        if self.applying_inbound.get() || !self.connected.get() {
            return;
        }
        let value = node.wire_value();
        if value.contains(['\r', '\n']) {
            warn!(path, "edit would split the line, dropped");
            return;
        }
        self.pending.borrow_mut().push_back(OutboundMessage::Edit {
            path: path.to_string(),
            value,
        });
    }

    fn drain(&self) -> Vec<OutboundMessage> {
        self.pending.borrow_mut().drain(..).collect()
    }
}

/// Suppresses edit recording while inbound values are applied.
struct InboundGuard(Rc<EditQueue>);

impl InboundGuard {
    fn new(queue: Rc<EditQueue>) -> Self {
        queue.applying_inbound.set(true);
        Self(queue)
    }
}

impl Drop for InboundGuard {
    fn drop(&mut self) {
        self.0.applying_inbound.set(false);
    }
}

/// Mirrors a remote tree over one multiplexed line transport.
pub struct SyncEngine<T: Transport, C: Clock = SystemClock> {
    config: SyncConfig,
    transport: T,
    clock: C,
    tree: Tree,
    pool: ConnectionPool,
    timers: Timers,
    status: ServerStatus,
    edits: Rc<EditQueue>,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl<T: Transport> SyncEngine<T> {
    /// Creates an engine driven by the system clock.
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> SyncEngine<T, C> {
    /// Creates an engine driven by the given clock.
    pub fn with_clock(config: SyncConfig, transport: T, clock: C) -> Self {
        let pool = ConnectionPool::new(config.first_port);
        Self {
            config,
            transport,
            clock,
            tree: Tree::new(ROOT_NAME),
            pool,
            timers: Timers::new(),
            status: ServerStatus::Created,
            edits: Rc::new(EditQueue::default()),
            subscribers: Vec::new(),
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The mirrored tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the tree.
    ///
    /// Observer changes and value edits made through this reference are
    /// picked up by the next [`poll`](Self::poll).
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The subscription slots.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Pending deadline of one timer.
    pub fn timer_deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.timers.deadline(kind)
    }

    /// Subscribes to engine events.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_status(&mut self, status: ServerStatus) {
        self.edits.connected.set(status.is_connected());
        if self.status != status {
            info!(from = %self.status, to = %status, "status changed");
            self.status = status;
            self.emit(EngineEvent::StatusChanged(status));
        }
    }

    /// Dispatches one transport event.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(line) => self.on_message(&line),
            TransportEvent::Reconnecting => self.on_reconnecting(),
            TransportEvent::Closed => self.on_closed(),
            TransportEvent::Error(detail) => self.on_error(&detail),
        }
    }

    /// The transport is open: request the schema and re-link every slot.
    pub fn on_opened(&mut self) {
        self.set_status(ServerStatus::Connected);
        self.request_schema();
        self.pool.on_reconnect();
        self.trigger_scheduler(self.config.open_delay);
        self.process_tree_events();
    }

    /// The transport dropped and is reconnecting.
    pub fn on_reconnecting(&mut self) {
        self.set_status(ServerStatus::Reconnecting);
        self.timers.cancel(TimerKind::SchemaRetry);
    }

    /// The transport is closed.
    pub fn on_closed(&mut self) {
        self.set_status(ServerStatus::Closed);
        self.timers.cancel(TimerKind::SchemaRetry);
        self.timers.cancel(TimerKind::Scheduler);
    }

    /// The transport reported a failure. State is left unchanged.
    pub fn on_error(&mut self, detail: &str) {
        warn!(%detail, "transport error");
    }

    /// Handles one inbound protocol line.
    ///
    /// Lines that do not parse are logged and dropped.
    pub fn on_message(&mut self, line: &str) {
        let message = match InboundMessage::parse(line) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "discarding inbound line");
                if let Some(port) = err.link_port() {
                    self.unlink_orphan(port);
                }
                return;
            }
        };
        match message {
            InboundMessage::Schema { document, .. } => self.handle_schema(&document),
            InboundMessage::Link {
                port,
                first,
                values,
            } => self.handle_link(port, first, &values),
            InboundMessage::Unlink { port } => self.handle_unlink(port),
            InboundMessage::Error {
                port,
                code,
                message,
            } => self.handle_error(port, code, &message),
            InboundMessage::Heartbeat { .. } => {}
        }
        self.process_tree_events();
    }

    fn send(&mut self, message: &OutboundMessage) {
        if !self.status.is_connected() {
            trace!(%message, "not connected, message dropped");
            return;
        }
        let line = message.to_string();
        debug!(%line, "sending");
        if let Err(err) = self.transport.send(&line) {
            warn!(error = %err, retryable = err.is_retryable(), "send failed");
        }
    }

    fn request_schema(&mut self) {
        self.send(&OutboundMessage::RequestSchema);
        let at = self.clock.now() + self.config.schema_retry_interval;
        self.timers.arm(TimerKind::SchemaRetry, at);
    }

    fn handle_schema(&mut self, document: &str) {
        self.timers.cancel(TimerKind::SchemaRetry);
        let root = self.tree.root();
        match self.tree.parse_schema_str(root, document) {
            Ok(nodes) => {
                self.install_update_observers();
                info!(nodes, "schema rebuilt");
                self.emit(EngineEvent::SchemaRebuilt { nodes });
            }
            Err(err) => {
                warn!(error = %err, "schema rejected, tree left empty");
                self.emit(EngineEvent::SchemaFailed(err.to_string()));
            }
        }
        // Every slot now points at a freed struct.
        self.schedule_activation();
    }

    /// Puts one permanent observer on every leaf. It turns accepted local
    /// changes into `path=value` edits.
    fn install_update_observers(&mut self) {
        let config = &self.config;
        let mut leaves = Vec::new();
        self.tree.walk(self.tree.root(), &mut |id, node, path| {
            if !node.is_struct() {
                leaves.push((id, config.join_path(path)));
            }
        });
        for (id, path) in leaves {
            let edits = Rc::clone(&self.edits);
            let observer: ObserverFn = Box::new(move |node| edits.record(&path, node));
            if let Err(err) = self.tree.add_observer(id, observer) {
                warn!(error = %err, "update observer not installed");
            }
        }
    }

    fn handle_link(&mut self, port: u32, first: usize, values: &[Value]) {
        let Some(slot) = self.pool.get(port) else {
            self.unlink_orphan(port);
            return;
        };
        if slot.task().is_closing() {
            trace!(port, "values for closing port ignored");
            return;
        }
        let bound = slot.bound();
        self.pool.data_received(port);

        let _guard = InboundGuard::new(Rc::clone(&self.edits));
        let reached = self.tree.read_value_array(bound, values, first);
        trace!(port, first, reached, "values applied");
    }

    /// Value updates on a port without a slot get an unlink back.
    fn unlink_orphan(&mut self, port: u32) {
        if self.pool.get(port).is_none() {
            debug!(port, "values for unbound port, unlinking");
            self.send(&OutboundMessage::Unlink { port });
        }
    }

    fn handle_unlink(&mut self, port: u32) {
        if self.pool.set_to_closed(port).is_some() {
            self.trigger_scheduler(Duration::ZERO);
        }
    }

    fn handle_error(&mut self, port: u32, code: ErrorCode, message: &str) {
        match code {
            ErrorCode::InvalidPort => {
                warn!(port, %message, "device rejected port");
                self.handle_unlink(port);
            }
            ErrorCode::SubscriberLimit => {
                let err = SyncError::SubscriberLimit(message.to_string());
                error!(port, error = %err, "session refused");
                self.emit(EngineEvent::Fatal(err.to_string()));
                self.timers.cancel_all();
                if let Err(err) = self.transport.close() {
                    warn!(error = %err, "closing transport failed");
                }
                self.set_status(ServerStatus::Closed);
            }
            ErrorCode::Other(code) => {
                debug!(port, code, %message, "unknown device error ignored");
            }
            _ => {
                warn!(port, code = code.code(), %message, "device reported error");
            }
        }
    }

    fn schedule_activation(&mut self) {
        let at = self.clock.now() + self.config.activation_debounce;
        self.timers.arm(TimerKind::Activation, at);
    }

    /// Aligns the pool with the structs consumers currently observe.
    fn check_activation(&mut self) {
        let interests = self.tree.collect_interests();
        debug!(interests = interests.len(), "reconciling subscriptions");
        self.pool.reconcile(&interests);
        if !self.timers.is_armed(TimerKind::Scheduler) {
            self.trigger_scheduler(Duration::ZERO);
        }
    }

    fn trigger_scheduler(&mut self, delay: Duration) {
        let at = self.clock.now() + delay;
        self.timers.arm(TimerKind::Scheduler, at);
    }

    /// Sends at most one link or unlink request and re-arms itself.
    fn run_scheduler(&mut self) {
        if !self.status.is_connected() {
            trace!("scheduler stopped while disconnected");
            return;
        }
        match self.pool.next_request(self.config.path_separator) {
            Some(request) => {
                self.send(&request);
                self.trigger_scheduler(self.config.scheduler_interval);
            }
            None => trace!("scheduler idle"),
        }
    }

    /// Drains tree-side signals: observer changes start the debounce,
    /// recorded edits are sent.
    fn process_tree_events(&mut self) {
        if self.tree.take_activation_request() {
            self.schedule_activation();
        }
        for edit in self.edits.drain() {
            self.send(&edit);
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.tree.activation_requested() || !self.edits.pending.borrow().is_empty() {
            return Some(self.clock.now());
        }
        self.timers.next_deadline()
    }

    /// Processes pending tree events, then fires every due timer in
    /// deadline order.
    pub fn poll(&mut self) {
        self.process_tree_events();
        let now = self.clock.now();
        for _ in 0..MAX_FIRES_PER_POLL {
            let Some(kind) = self.timers.pop_due(now) else {
                break;
            };
            trace!(?kind, "timer fired");
            match kind {
                TimerKind::Activation => self.check_activation(),
                TimerKind::SchemaRetry => {
                    debug!("schema not received, requesting again");
                    self.request_schema();
                }
                TimerKind::Scheduler => self.run_scheduler(),
            }
            self.process_tree_events();
        }
    }

    /// Resolves a dotted path to a node.
    pub fn resolve(&self, path: &str) -> SyncResult<NodeId> {
        self.tree
            .find(path)
            .ok_or_else(|| SyncError::UnknownPath(path.to_string()))
    }

    /// Registers a consumer observer on a node.
    ///
    /// A second observer on a leaf makes its struct wanted; the engine
    /// links it after the debounce.
    pub fn observe(&mut self, node: NodeId, callback: ObserverFn) -> SyncResult<ObserverId> {
        let id = self.tree.add_observer(node, callback)?;
        self.process_tree_events();
        Ok(id)
    }

    /// Removes a consumer observer.
    pub fn unobserve(&mut self, node: NodeId, observer: ObserverId) -> bool {
        let removed = self.tree.remove_observer(node, observer);
        self.process_tree_events();
        removed
    }

    /// Assigns a leaf's value locally and sends it upstream if accepted.
    ///
    /// Text containing control characters is refused, since an edit
    /// travels as a single line.
    pub fn set_value(&mut self, path: &str, value: impl Into<Value>) -> SyncResult<bool> {
        let id = self.resolve(path)?;
        let value = value.into();
        if value.as_str().is_some_and(|s| s.chars().any(char::is_control)) {
            warn!(path, "control characters in local edit, refused");
            return Ok(false);
        }
        let accepted = self.tree.set_value(id, value);
        self.process_tree_events();
        Ok(accepted)
    }
}

impl<T: Transport + fmt::Debug, C: Clock> fmt::Debug for SyncEngine<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.status)
            .field("nodes", &self.tree.node_count())
            .field("slots", &self.pool.len())
            .field("transport", &self.transport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::pool::SlotTask;
    use crate::transport::MockTransport;

    const SCHEMA: &str = r#"t 0 [[66,0,"sub",[[1,0,"x",3],[1,0,"y",4]]],[1,0,"top",1]]"#;

    fn engine() -> (SyncEngine<MockTransport, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let engine = SyncEngine::with_clock(SyncConfig::default(), MockTransport::new(), clock.clone());
        (engine, clock)
    }

    fn connected() -> (SyncEngine<MockTransport, ManualClock>, ManualClock) {
        let (mut engine, clock) = engine();
        engine.on_opened();
        engine.on_message(SCHEMA);
        engine.transport_mut().take_sent();
        (engine, clock)
    }

    fn run_for(engine: &mut SyncEngine<MockTransport, ManualClock>, clock: &ManualClock, ms: u64) {
        for _ in 0..ms / 10 {
            clock.advance(Duration::from_millis(10));
            engine.poll();
        }
    }

    #[test]
    fn open_requests_schema_and_retries() {
        let (mut engine, clock) = engine();
        let events = engine.subscribe();
        engine.on_opened();
        assert_eq!(engine.status(), ServerStatus::Connected);
        assert_eq!(engine.transport().sent(), ["T"]);
        assert_eq!(
            events.try_recv().unwrap(),
            EngineEvent::StatusChanged(ServerStatus::Connected)
        );

        run_for(&mut engine, &clock, 2000);
        assert_eq!(engine.transport().sent(), ["T", "T"]);

        engine.on_message(SCHEMA);
        run_for(&mut engine, &clock, 5000);
        assert_eq!(engine.transport().sent(), ["T", "T"]);
        assert_eq!(
            events.try_iter().last(),
            Some(EngineEvent::SchemaRebuilt { nodes: 4 })
        );
    }

    #[test]
    fn schema_installs_one_observer_per_leaf() {
        let (engine, _) = connected();
        let tree = engine.tree();
        let x = tree.find("sub.x").unwrap();
        let sub = tree.find("sub").unwrap();
        assert_eq!(tree.observer_count(x), 1);
        assert_eq!(tree.observer_count(sub), 0);
        assert!(!tree.is_observed(x));
    }

    #[test]
    fn nothing_sent_before_connect() {
        let (mut engine, _) = engine();
        engine.on_message(SCHEMA);
        assert!(engine.set_value("sub.x", 9).unwrap());
        assert!(engine.transport().sent().is_empty());
        assert_eq!(engine.status(), ServerStatus::Created);
    }

    #[test]
    fn local_edit_goes_upstream() {
        let (mut engine, _) = connected();
        assert!(engine.set_value("sub.x", 7).unwrap());
        assert!(!engine.set_value("sub.x", "abc").unwrap());
        assert_eq!(engine.transport().sent(), ["sub.x=7"]);
        assert!(matches!(
            engine.set_value("sub.nope", 1),
            Err(SyncError::UnknownPath(_))
        ));
    }

    #[test]
    fn observing_links_struct() {
        let (mut engine, clock) = connected();
        let x = engine.resolve("sub.x").unwrap();
        engine.observe(x, Box::new(|_| {})).unwrap();
        assert!(engine.timer_deadline(TimerKind::Activation).is_some());

        run_for(&mut engine, &clock, 100);
        assert_eq!(engine.transport().sent(), ["L 1 sub"]);
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Open);

        engine.on_message("l 1 0 [5,6]");
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Linked);
        let tree = engine.tree();
        assert_eq!(tree.get(x).unwrap().as_number(), Some(5.0));
        assert_eq!(tree.get(tree.find("sub.y").unwrap()).unwrap().as_number(), Some(6.0));
        assert_eq!(engine.transport().sent(), ["L 1 sub"]);
    }

    #[test]
    fn observing_root_leaf_links_empty_path() {
        let (mut engine, clock) = connected();
        let top = engine.resolve("top").unwrap();
        engine.observe(top, Box::new(|_| {})).unwrap();
        run_for(&mut engine, &clock, 100);
        assert_eq!(engine.transport().sent(), ["L 1 "]);
    }

    #[test]
    fn unbound_port_is_unlinked() {
        let (mut engine, _) = connected();
        engine.on_message("l 7 0 [1]");
        assert_eq!(engine.transport().sent(), ["U 7"]);
    }

    #[test]
    fn unbound_port_with_broken_values_is_unlinked() {
        let (mut engine, _) = connected();
        engine.on_message("l 7 0 [1,");
        engine.on_message("l 8 [1]");
        assert_eq!(engine.transport().sent(), ["U 7", "U 8"]);
    }

    #[test]
    fn bound_port_with_broken_values_is_kept() {
        let (mut engine, clock) = connected();
        let x = engine.resolve("sub.x").unwrap();
        engine.observe(x, Box::new(|_| {})).unwrap();
        run_for(&mut engine, &clock, 100);
        engine.transport_mut().take_sent();

        engine.on_message("l 1 0 [1,");
        assert!(engine.transport().sent().is_empty());
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Open);
        assert_eq!(engine.tree().get(x).unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn unobserve_then_unlink_frees_slot() {
        let (mut engine, clock) = connected();
        let x = engine.resolve("sub.x").unwrap();
        let id = engine.observe(x, Box::new(|_| {})).unwrap();
        run_for(&mut engine, &clock, 100);
        engine.on_message("l 1 0 [5]");

        engine.unobserve(x, id);
        run_for(&mut engine, &clock, 1000);
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Close);
        assert_eq!(engine.transport().sent().last().map(String::as_str), Some("U 1"));

        engine.on_message("l 1 0 [9]");
        assert_eq!(engine.tree().get(x).unwrap().as_number(), Some(5.0));

        engine.on_message("u 1");
        assert!(engine.pool().is_empty());
    }

    #[test]
    fn reconnect_relinks() {
        let (mut engine, clock) = connected();
        let x = engine.resolve("sub.x").unwrap();
        engine.observe(x, Box::new(|_| {})).unwrap();
        run_for(&mut engine, &clock, 100);
        engine.on_message("l 1 0 [5]");
        engine.transport_mut().take_sent();

        engine.on_reconnecting();
        assert_eq!(engine.status(), ServerStatus::Reconnecting);
        assert!(engine.timer_deadline(TimerKind::SchemaRetry).is_none());

        engine.on_opened();
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Open);
        run_for(&mut engine, &clock, 100);
        assert_eq!(engine.transport().sent(), ["T", "L 1 sub"]);
    }

    #[test]
    fn subscriber_limit_is_fatal() {
        let (mut engine, _) = connected();
        let events = engine.subscribe();
        engine.on_message("E 0 100 max clients");
        assert!(engine.transport().is_closed());
        assert_eq!(engine.status(), ServerStatus::Closed);
        assert_eq!(engine.next_deadline(), None);
        let received: Vec<_> = events.try_iter().collect();
        assert!(matches!(received[0], EngineEvent::Fatal(ref msg) if msg.contains("max clients")));
        assert_eq!(received[1], EngineEvent::StatusChanged(ServerStatus::Closed));
    }

    #[test]
    fn invalid_port_error_frees_closing_slot() {
        let (mut engine, clock) = connected();
        let x = engine.resolve("sub.x").unwrap();
        let id = engine.observe(x, Box::new(|_| {})).unwrap();
        run_for(&mut engine, &clock, 100);
        engine.unobserve(x, id);
        run_for(&mut engine, &clock, 100);
        assert_eq!(engine.pool().get(1).unwrap().task(), SlotTask::Close);

        engine.on_message("E 1 5 invalid port");
        assert!(engine.pool().is_empty());
        assert_eq!(engine.status(), ServerStatus::Connected);
    }

    #[test]
    fn bad_schema_empties_tree() {
        let (mut engine, _) = connected();
        let events = engine.subscribe();
        engine.on_message(r#"t 0 [[7,0,"odd",1]]"#);
        assert_eq!(engine.tree().node_count(), 1);
        assert!(matches!(events.try_recv(), Ok(EngineEvent::SchemaFailed(_))));
    }

    #[test]
    fn closed_stops_timers() {
        let (mut engine, _) = engine();
        engine.on_opened();
        engine.on_closed();
        assert_eq!(engine.status(), ServerStatus::Closed);
        assert!(engine.timer_deadline(TimerKind::SchemaRetry).is_none());
        assert!(engine.timer_deadline(TimerKind::Scheduler).is_none());
        engine.on_error("socket reset");
        assert_eq!(engine.status(), ServerStatus::Closed);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let (mut engine, _) = engine();
        drop(engine.subscribe());
        let live = engine.subscribe();
        engine.on_opened();
        assert_eq!(engine.subscribers.len(), 1);
        assert!(live.try_recv().is_ok());
    }
}
