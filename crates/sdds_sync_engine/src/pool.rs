//! Connection pool: the table of multiplexed subscription ports.
//!
//! Each slot binds one port to one struct of the tree. A slot's port is
//! its table index plus the configured base and never changes while the
//! slot exists. Freed entries stay in the table as holes so later slots
//! keep their ports.

use sdds_sync_protocol::OutboundMessage;
use sdds_tree::{join_path_with, Interest, NodeId};
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotTask {
    /// Link request pending or unacknowledged.
    Open,
    /// Link acknowledged; values are flowing.
    Linked,
    /// Unlink pending; the slot is freed on acknowledgement.
    Close,
    /// Unlink pending; the slot reopens for its new path on acknowledgement.
    CloseOpen,
}

impl SlotTask {
    /// Returns true if an unlink is pending.
    pub fn is_closing(self) -> bool {
        matches!(self, SlotTask::Close | SlotTask::CloseOpen)
    }
}

impl fmt::Display for SlotTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotTask::Open => "open",
            SlotTask::Linked => "linked",
            SlotTask::Close => "close",
            SlotTask::CloseOpen => "closeOpen",
        };
        f.write_str(s)
    }
}

/// One multiplexed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSlot {
    path: Vec<String>,
    bound: NodeId,
    port: u32,
    task: SlotTask,
}

impl ConnectionSlot {
    fn new(interest: &Interest, port: u32) -> Self {
        Self {
            path: interest.path.clone(),
            bound: interest.node,
            port,
            task: SlotTask::Open,
        }
    }

    /// Path of the bound struct, captured at allocation.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The struct this slot feeds.
    pub fn bound(&self) -> NodeId {
        self.bound
    }

    /// The slot's port.
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Current lifecycle state.
    pub fn task(&self) -> SlotTask {
        self.task
    }

    fn rebind(&mut self, interest: &Interest) {
        self.bound = interest.node;
        self.path = interest.path.clone();
        self.task = SlotTask::CloseOpen;
    }
}

/// Slot table with round-robin request scheduling.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    slots: Vec<Option<ConnectionSlot>>,
    first_port: u32,
    cursor: usize,
}

impl ConnectionPool {
    /// Creates an empty pool whose first slot gets `first_port`.
    pub fn new(first_port: u32) -> Self {
        Self {
            slots: Vec::new(),
            first_port,
            cursor: 0,
        }
    }

    /// Length of the table, holes included.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Returns true if no slot is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates live slots in table order.
    pub fn slots(&self) -> impl Iterator<Item = &ConnectionSlot> {
        self.slots.iter().flatten()
    }

    fn index_of(&self, port: u32) -> Option<usize> {
        let idx = port.checked_sub(self.first_port)? as usize;
        (idx < self.slots.len()).then_some(idx)
    }

    /// `None` once the index runs past the port range.
    fn port_at(&self, idx: usize) -> Option<u32> {
        u32::try_from(idx)
            .ok()
            .and_then(|idx| self.first_port.checked_add(idx))
    }

    /// Looks up a live slot by port.
    pub fn get(&self, port: u32) -> Option<&ConnectionSlot> {
        self.index_of(port)
            .and_then(|idx| self.slots[idx].as_ref())
    }

    fn get_mut(&mut self, port: u32) -> Option<&mut ConnectionSlot> {
        let idx = self.index_of(port)?;
        self.slots[idx].as_mut()
    }

    /// Finds the slot bound to a struct.
    pub fn find_by_struct(&self, node: NodeId) -> Option<&ConnectionSlot> {
        self.slots().find(|slot| slot.bound == node)
    }

    /// Binds a new subscription and returns its port.
    ///
    /// A slot waiting to be closed is taken over first, then the first
    /// hole, and only then is the table grown. Returns `None` when no port
    /// is left.
    pub fn allocate(&mut self, interest: &Interest) -> Option<u32> {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|slot| slot.task == SlotTask::Close)
        {
            slot.rebind(interest);
            debug!(port = slot.port, path = ?slot.path, "slot recycled");
            return Some(slot.port);
        }

        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        let Some(port) = self.port_at(idx) else {
            warn!(path = ?interest.path, "port range exhausted, struct not linked");
            return None;
        };
        let slot = Some(ConnectionSlot::new(interest, port));
        if idx == self.slots.len() {
            self.slots.push(slot);
        } else {
            self.slots[idx] = slot;
        }
        debug!(port, path = ?interest.path, "slot allocated");
        Some(port)
    }

    /// Marks a slot for unlinking. Returns false if the port is not live.
    pub fn flag_for_close(&mut self, port: u32) -> bool {
        match self.get_mut(port) {
            Some(slot) => {
                if slot.task != SlotTask::Close {
                    debug!(port, from = %slot.task, "slot flagged for close");
                    slot.task = SlotTask::Close;
                }
                true
            }
            None => false,
        }
    }

    /// Every linked slot must be requested again.
    pub fn on_reconnect(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.task == SlotTask::Linked {
                slot.task = SlotTask::Open;
            }
        }
    }

    /// Records that values arrived on a port.
    pub fn data_received(&mut self, port: u32) {
        if let Some(slot) = self.get_mut(port) {
            if slot.task == SlotTask::Open {
                debug!(port, "slot linked");
                slot.task = SlotTask::Linked;
            }
        }
    }

    /// Applies an unlink acknowledgement.
    ///
    /// A `close` slot is freed and `None` returned. A `closeOpen` slot goes
    /// back to `open` for its new path. Any other live slot is returned
    /// unchanged.
    pub fn set_to_closed(&mut self, port: u32) -> Option<&ConnectionSlot> {
        let idx = self.index_of(port)?;
        let task = self.slots[idx].as_ref()?.task;
        match task {
            SlotTask::Close => {
                self.slots[idx] = None;
                debug!(port, "slot freed");
                None
            }
            SlotTask::CloseOpen => {
                let slot = self.slots[idx].as_mut()?;
                slot.task = SlotTask::Open;
                debug!(port, "slot reopened");
                Some(&*slot)
            }
            SlotTask::Open | SlotTask::Linked => self.slots[idx].as_ref(),
        }
    }

    /// Aligns the table with the current set of interests.
    ///
    /// Slots whose struct is no longer of interest are flagged for close.
    /// Each interest without a slot gets one, and an interest whose slot is
    /// already closing is rebound to it.
    pub fn reconcile(&mut self, interests: &[Interest]) {
        let stale: Vec<u32> = self
            .slots()
            .filter(|slot| !interests.iter().any(|i| i.node == slot.bound))
            .map(|slot| slot.port)
            .collect();
        for port in stale {
            self.flag_for_close(port);
        }

        for interest in interests {
            let existing = self
                .find_by_struct(interest.node)
                .map(|slot| (slot.port, slot.task));
            match existing {
                None => {
                    self.allocate(interest);
                }
                Some((port, SlotTask::Close)) => {
                    if let Some(slot) = self.get_mut(port) {
                        slot.rebind(interest);
                        debug!(port, "slot reactivated");
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Picks the next request in round-robin order.
    ///
    /// Pending unlinks take priority over pending links. The cursor moves
    /// past the chosen slot so every slot gets its turn.
    pub fn next_request(&mut self, separator: char) -> Option<OutboundMessage> {
        if self.slots.is_empty() {
            return None;
        }
        let (idx, request) = self
            .find_round_robin(|slot| {
                slot.task
                    .is_closing()
                    .then(|| OutboundMessage::Unlink { port: slot.port })
            })
            .or_else(|| {
                self.find_round_robin(|slot| {
                    (slot.task == SlotTask::Open).then(|| OutboundMessage::Link {
                        port: slot.port,
                        path: join_path_with(&slot.path, separator),
                    })
                })
            })?;
        self.cursor = idx + 1;
        Some(request)
    }

    fn find_round_robin(
        &self,
        pick: impl Fn(&ConnectionSlot) -> Option<OutboundMessage>,
    ) -> Option<(usize, OutboundMessage)> {
        let len = self.slots.len();
        let start = if self.cursor < len { self.cursor } else { 0 };
        (0..len)
            .map(|offset| (start + offset) % len)
            .find_map(|idx| {
                let slot = self.slots[idx].as_ref()?;
                pick(slot).map(|request| (idx, request))
            })
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}
