//! Dump command implementation.

use super::{Command, Engine, Step};
use crate::error::CliError;
use sdds_sync_engine::EngineEvent;
use sdds_tree::Tree;

/// Prints the tree once and exits.
pub struct Dump;

impl Command for Dump {
    fn on_event(&mut self, engine: &mut Engine, event: &EngineEvent) -> Result<Step, CliError> {
        match event {
            EngineEvent::SchemaRebuilt { .. } => {
                for line in render(engine.tree()) {
                    println!("{line}");
                }
                Ok(Step::Done)
            }
            _ => Ok(Step::Continue),
        }
    }
}

/// One line per node: indented name, type and current value.
pub fn render(tree: &Tree) -> Vec<String> {
    let mut lines = Vec::new();
    tree.walk(tree.root(), &mut |_, node, path| {
        let indent = "  ".repeat(path.len() - 1);
        let label = format!("{indent}{}", node.name());
        if node.is_struct() {
            lines.push(format!("{label:<24} {}", node.base_type()));
        } else {
            lines.push(format!(
                "{label:<24} {:<8} {}",
                node.base_type(),
                node.display_value()
            ));
        }
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_indents_nested_nodes() {
        let mut tree = Tree::new("data");
        let root = tree.root();
        tree.parse_schema_str(
            root,
            r#"[[66,0,"sub",[[1,0,"x",3],[49,0,"sw",["on","off"]]]],[129,0,"name","dev"]]"#,
        )
        .unwrap();

        let lines = render(&tree);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("sub "));
        assert!(lines[0].trim_end().ends_with("struct"));
        assert!(lines[1].starts_with("  x "));
        assert!(lines[1].ends_with('3'));
        assert!(lines[2].ends_with("on"));
        assert!(lines[3].starts_with("name "));
        assert!(lines[3].ends_with("dev"));
    }
}
