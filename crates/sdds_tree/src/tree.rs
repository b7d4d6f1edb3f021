//! Arena-backed value tree.
//!
//! Nodes live in a slot arena addressed by [`NodeId`]. Structs hold ordered
//! child handles and every node holds its parent's handle, so paths can be
//! rebuilt and activation signals can bubble to the root without any
//! ownership cycle.
//!
//! The tree does not run reconciliation itself. Observer registration
//! anywhere below the root raises a pending activation request that the
//! owner drains with [`Tree::take_activation_request`].

use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, ValueNode};
use crate::observer::{ObserverFn, ObserverId, ObserverRegistry};
use serde_json::Value;
use tracing::trace;

/// Separator used when joining node names into a path string.
pub const PATH_SEP: char = '.';

#[derive(Debug)]
struct Entry {
    node: ValueNode,
    observers: ObserverRegistry,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// A struct with at least one consumer-observed leaf directly beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    /// Path of the struct, relative to the root.
    pub path: Vec<String>,
    /// The struct node.
    pub node: NodeId,
    /// First observed leaf.
    pub first: NodeId,
    /// Last observed leaf, if more than one is observed.
    pub last: Option<NodeId>,
}

/// The mirrored value tree.
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    activation_requested: bool,
}

impl Tree {
    /// Creates a tree holding only an empty root struct.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            activation_requested: false,
        };
        tree.root = tree.alloc(ValueNode::new_struct(root_name));
        tree
    }

    fn alloc(&mut self, node: ValueNode) -> NodeId {
        let entry = Entry {
            node,
            observers: ObserverRegistry::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
    }

    /// Returns the root struct. Its handle is stable for the tree's lifetime.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Resolves a handle.
    pub fn get(&self, id: NodeId) -> Option<&ValueNode> {
        self.entry(id).map(|e| &e.node)
    }

    /// Returns true if the handle refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Children of a struct; empty for leaves and stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(ValueNode::children).unwrap_or(&[])
    }

    /// Appends a node to a struct's child list and notifies the struct's observers.
    pub fn push_child(&mut self, parent: NodeId, mut node: ValueNode) -> TreeResult<NodeId> {
        let parent_node = self.get(parent).ok_or(TreeError::StaleNode(parent))?;
        if !parent_node.is_struct() {
            return Err(TreeError::NotAStruct(parent));
        }
        node.parent = Some(parent);
        node.idx = parent_node.children().len();
        let id = self.alloc(node);
        if let Some(children) = self
            .entry_mut(parent)
            .and_then(|e| e.node.children_mut())
        {
            children.push(id);
        }
        self.notify(parent);
        Ok(id)
    }

    /// Frees every child of a struct, leaving it empty.
    pub fn clear_children(&mut self, id: NodeId) -> TreeResult<()> {
        let children = {
            let entry = self.entry_mut(id).ok_or(TreeError::StaleNode(id))?;
            let children = entry
                .node
                .children_mut()
                .ok_or(TreeError::NotAStruct(id))?;
            std::mem::take(children)
        };
        for child in children {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Detaches and frees the child at `idx`, reindexing its later siblings.
    ///
    /// Returns false if the index is out of range.
    pub fn remove_child(&mut self, parent: NodeId, idx: usize) -> bool {
        let removed = match self.entry_mut(parent).and_then(|e| e.node.children_mut()) {
            Some(children) if idx < children.len() => children.remove(idx),
            _ => return false,
        };
        self.free_subtree(removed);
        let siblings = self.children(parent).to_vec();
        for (pos, sibling) in siblings.into_iter().enumerate().skip(idx) {
            if let Some(entry) = self.entry_mut(sibling) {
                entry.node.idx = pos;
            }
        }
        self.notify(parent);
        true
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index as usize)
                .filter(|s| s.generation == current.generation)
            else {
                continue;
            };
            if let Some(entry) = slot.entry.take() {
                trace!(node = entry.node.id(), name = %entry.node.name(), "node cleanup");
                stack.extend_from_slice(entry.node.children());
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    /// Assigns a value through the node's validation and notifies observers
    /// if it was accepted.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<Value>) -> bool {
        self.apply_value(id, &value.into())
    }

    pub(crate) fn apply_value(&mut self, id: NodeId, value: &Value) -> bool {
        let accepted = self
            .entry_mut(id)
            .is_some_and(|entry| entry.node.apply(value));
        if accepted {
            self.notify(id);
        }
        accepted
    }

    /// Applies a contiguous run of values to a struct's children starting
    /// at `first`. Values past the end of the child list are dropped.
    ///
    /// Returns the number of children the run reached.
    pub fn read_value_array(&mut self, id: NodeId, values: &[Value], first: usize) -> usize {
        let children = self.children(id).to_vec();
        let targets = children.into_iter().skip(first).zip(values);
        let mut reached = 0;
        for (child, value) in targets {
            if !self.apply_value(child, value) {
                trace!(name = ?self.get(child).map(ValueNode::name), %value, "value discarded");
            }
            reached += 1;
        }
        reached
    }

    /// Invokes the active observers of a node.
    pub fn notify(&mut self, id: NodeId) {
        if let Some(Entry { node, observers }) = self.entry_mut(id) {
            observers.notify(node);
        }
    }

    /// Registers an observer and raises an activation request.
    pub fn add_observer(&mut self, id: NodeId, callback: ObserverFn) -> TreeResult<ObserverId> {
        let entry = self.entry_mut(id).ok_or(TreeError::StaleNode(id))?;
        let observer = entry.observers.add(callback);
        self.signal_activation(id);
        Ok(observer)
    }

    /// Unregisters an observer and raises an activation request.
    pub fn remove_observer(&mut self, id: NodeId, observer: ObserverId) -> bool {
        let removed = self
            .entry_mut(id)
            .is_some_and(|e| e.observers.remove(observer));
        self.signal_activation(id);
        removed
    }

    /// Mutes or unmutes an observer without changing the observer count.
    pub fn set_observer_active(&mut self, id: NodeId, observer: ObserverId, active: bool) -> bool {
        self.entry_mut(id)
            .is_some_and(|e| e.observers.set_active(observer, active))
    }

    /// Number of observers registered on a node.
    pub fn observer_count(&self, id: NodeId) -> usize {
        self.entry(id).map_or(0, |e| e.observers.len())
    }

    /// True when a consumer watches the node (see [`ObserverRegistry::is_observed`]).
    pub fn is_observed(&self, id: NodeId) -> bool {
        self.entry(id).is_some_and(|e| e.observers.is_observed())
    }

    fn signal_activation(&mut self, from: NodeId) {
        let mut current = Some(from);
        while let Some(id) = current {
            if id == self.root {
                self.activation_requested = true;
                return;
            }
            current = self.get(id).and_then(ValueNode::parent);
        }
    }

    /// Returns and clears the pending activation request.
    pub fn take_activation_request(&mut self) -> bool {
        std::mem::take(&mut self.activation_requested)
    }

    /// Returns whether an activation request is pending.
    pub fn activation_requested(&self) -> bool {
        self.activation_requested
    }

    /// Names from below the root down to the node. The root's path is empty.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            let Some(parent) = node.parent() else { break };
            path.push(node.name().to_string());
            current = self.get(parent);
        }
        path.reverse();
        path
    }

    /// The node's path joined with [`PATH_SEP`].
    pub fn path_string(&self, id: NodeId) -> String {
        join_path(&self.path(id))
    }

    /// Finds a struct by path segments, starting at the root.
    ///
    /// Returns `None` if a segment does not name a child struct, or if the
    /// target is empty and `allow_empty` is false.
    pub fn find_struct_by_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
        allow_empty: bool,
    ) -> Option<NodeId> {
        let mut current = self.root;
        for segment in segments {
            current = self.children(current).iter().copied().find(|&child| {
                self.get(child)
                    .is_some_and(|n| n.is_struct() && n.name() == segment.as_ref())
            })?;
        }
        if !allow_empty && self.children(current).is_empty() {
            return None;
        }
        Some(current)
    }

    /// Finds a struct by a path string split on `.` or `/`.
    pub fn find_struct(&self, path: &str, allow_empty: bool) -> Option<NodeId> {
        let segments = split_path(path);
        self.find_struct_by_segments(&segments, allow_empty)
    }

    /// Resolves any node by a path string split on `.` or `/`.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in split_path(path) {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|&child| self.get(child).is_some_and(|n| n.name() == segment))?;
        }
        Some(current)
    }

    /// Visits every descendant of `start` in depth-first pre-order with its
    /// path relative to `start`.
    pub fn walk(&self, start: NodeId, visitor: &mut dyn FnMut(NodeId, &ValueNode, &[String])) {
        let mut path = Vec::new();
        self.walk_inner(start, &mut path, visitor);
    }

    fn walk_inner(
        &self,
        id: NodeId,
        path: &mut Vec<String>,
        visitor: &mut dyn FnMut(NodeId, &ValueNode, &[String]),
    ) {
        for &child in self.children(id) {
            let Some(node) = self.get(child) else { continue };
            path.push(node.name().to_string());
            visitor(child, node, path);
            if node.is_struct() {
                self.walk_inner(child, path, visitor);
            }
            path.pop();
        }
    }

    /// Collects every struct that has a consumer-observed leaf directly
    /// beneath it. Nested structs are listed before their parent.
    pub fn collect_interests(&self) -> Vec<Interest> {
        let mut interests = Vec::new();
        let mut path = Vec::new();
        self.collect_inner(self.root, &mut path, &mut interests);
        interests
    }

    fn collect_inner(&self, id: NodeId, path: &mut Vec<String>, out: &mut Vec<Interest>) {
        let mut first = None;
        let mut last = None;
        for &child in self.children(id) {
            let Some(node) = self.get(child) else { continue };
            if node.is_struct() {
                path.push(node.name().to_string());
                self.collect_inner(child, path, out);
                path.pop();
            } else if self.is_observed(child) {
                if first.is_none() {
                    first = Some(child);
                } else {
                    last = Some(child);
                }
            }
        }
        if let Some(first) = first {
            out.push(Interest {
                path: path.clone(),
                node: id,
                first,
                last,
            });
        }
    }
}

/// Joins path segments with [`PATH_SEP`].
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    join_path_with(segments, PATH_SEP)
}

/// Joins path segments with `separator`.
pub fn join_path_with<S: AsRef<str>>(segments: &[S], separator: char) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(segment.as_ref());
    }
    out
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(['.', '/']).filter(|s| !s.is_empty()).collect()
}
