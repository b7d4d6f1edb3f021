//! Watch command implementation.

use super::{Command, Engine, Step};
use crate::error::CliError;
use sdds_sync_engine::EngineEvent;
use sdds_tree::{NodeId, Tree};
use tracing::{info, warn};

/// Prints value changes under a path until interrupted.
pub struct Watch {
    path: String,
}

impl Watch {
    /// Watches the struct or leaf at `path`.
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl Command for Watch {
    fn on_event(&mut self, engine: &mut Engine, event: &EngineEvent) -> Result<Step, CliError> {
        // A rebuild drops every observer, so re-attach on each one.
        if !matches!(event, EngineEvent::SchemaRebuilt { .. }) {
            return Ok(Step::Continue);
        }
        let target = engine.resolve(&self.path)?;
        let leaves = leaves_of(engine.tree(), target);
        if leaves.is_empty() {
            warn!(path = %self.path, "nothing to watch");
        }
        for leaf in leaves {
            let label = engine.tree().path_string(leaf);
            engine.observe(
                leaf,
                Box::new(move |node| println!("{label} = {}", node.display_value())),
            )?;
        }
        info!(path = %self.path, "watching");
        Ok(Step::Continue)
    }
}

/// The node itself if it is a leaf, otherwise its direct leaf children.
pub fn leaves_of(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    match tree.get(id) {
        Some(node) if node.is_struct() => tree
            .children(id)
            .iter()
            .copied()
            .filter(|&child| tree.get(child).is_some_and(|n| !n.is_struct()))
            .collect(),
        Some(_) => vec![id],
        None => Vec::new(),
    }
}
