//! Per-node observer registry.
//!
//! A registry is an ordered list of callbacks with an activity flag each.
//! Deactivating an observer keeps it registered (and counted) but skips it
//! on notification, which lets a consumer mute itself while it is the
//! cause of a change.

use crate::node::ValueNode;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static OBSERVER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Callback invoked with the node after an accepted change.
pub type ObserverFn = Box<dyn FnMut(&ValueNode)>;

/// Handle of a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observer {
    id: ObserverId,
    callback: ObserverFn,
    active: bool,
}

/// Ordered list of `(callback, active)` pairs owned by one node.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Observer>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an active observer.
    pub fn add(&mut self, callback: ObserverFn) -> ObserverId {
        let id = ObserverId(OBSERVER_COUNTER.fetch_add(1, Ordering::Relaxed));
        self.observers.push(Observer {
            id,
            callback,
            active: true,
        });
        id
    }

    /// Removes an observer. Returns false if it was not registered here.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Enables or disables an observer without removing it.
    pub fn set_active(&mut self, id: ObserverId, active: bool) -> bool {
        match self.observers.iter_mut().find(|o| o.id == id) {
            Some(o) => {
                o.active = active;
                true
            }
            None => false,
        }
    }

    /// Returns whether the observer is registered and active.
    pub fn is_active(&self, id: ObserverId) -> bool {
        self.observers.iter().any(|o| o.id == id && o.active)
    }

    /// Number of registered observers, active or not.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// True when a consumer watches the node.
    ///
    /// The sync engine keeps one permanent observer on every leaf, so only
    /// a second registration means someone else is interested.
    pub fn is_observed(&self) -> bool {
        self.observers.len() > 1
    }

    /// Invokes every active observer with the node.
    pub fn notify(&mut self, node: &ValueNode) {
        for observer in self.observers.iter_mut().filter(|o| o.active) {
            (observer.callback)(node);
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.observers.len())
            .field(
                "active",
                &self.observers.iter().filter(|o| o.active).count(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, ObserverFn) {
        let hits = Rc::new(Cell::new(0));
        let inner = Rc::clone(&hits);
        (hits, Box::new(move |_| inner.set(inner.get() + 1)))
    }

    #[test]
    fn observed_needs_two_observers() {
        let mut registry = ObserverRegistry::new();
        assert!(!registry.is_observed());

        let (_, cb) = counter();
        let permanent = registry.add(cb);
        assert!(!registry.is_observed());

        let (_, cb) = counter();
        let consumer = registry.add(cb);
        assert!(registry.is_observed());

        assert!(registry.remove(consumer));
        assert!(!registry.is_observed());
        assert!(!registry.remove(consumer));
        assert!(registry.remove(permanent));
        assert!(registry.is_empty());
    }

    #[test]
    fn inactive_observers_are_skipped() {
        let node = ValueNode::new_struct("s");
        let mut registry = ObserverRegistry::new();
        let (a_hits, a) = counter();
        let (b_hits, b) = counter();
        let a_id = registry.add(a);
        registry.add(b);

        registry.notify(&node);
        assert_eq!((a_hits.get(), b_hits.get()), (1, 1));

        assert!(registry.set_active(a_id, false));
        assert!(!registry.is_active(a_id));
        registry.notify(&node);
        assert_eq!((a_hits.get(), b_hits.get()), (1, 2));
        assert_eq!(registry.len(), 2);

        registry.set_active(a_id, true);
        registry.notify(&node);
        assert_eq!((a_hits.get(), b_hits.get()), (2, 3));
    }
}
