//! Canonical schema documents and tree helpers.

use sdds_tree::{Tree, TypeCode};
use serde_json::Value;

/// A small device tree in the verbose keyed encoding.
///
/// Top level: `cntSwitch` (enum), `Fcnt` (uint8, readonly), `sub` (struct),
/// `filter` (uint8), `value` (float32). `sub` holds `filter`, `value21`,
/// `time1` and `led`.
pub const DEMO_SCHEMA: &str = r#"[
{"type":49,"opt":0,"name":"cntSwitch","value":"on","enums":["on","off"]},
{"type":1,"opt":1,"name":"Fcnt","value":5},
{"type":66,"opt":0,"name":"sub","value":[
  {"type":1,"opt":0,"name":"filter","value":10},
  {"type":36,"opt":0,"name":"value21","value":7.5},
  {"type":4,"opt":0,"name":"time1","value":1000},
  {"type":49,"opt":0,"name":"led","value":"off","enums":["on","off"]}
]},
{"type":1,"opt":0,"name":"filter","value":10},
{"type":36,"opt":0,"name":"value","value":0.0}
]"#;

/// The same tree as [`DEMO_SCHEMA`] in the compact encoding with a shared
/// enum dictionary. Enums start at their first label.
pub const DEMO_SCHEMA_COMPACT: &str = r#"{"d":[
[49,0,"cntSwitch",0],
[1,1,"Fcnt",5],
[66,0,"sub",[[1,0,"filter",10],[36,0,"value21",7.5],[4,0,"time1",1000],[49,0,"led",0]]],
[1,0,"filter",10],
[36,0,"value",0]
],"e":[["on","off"]]}"#;

/// Two sibling structs and one nested struct, for pool scheduling tests.
pub const MULTI_STRUCT_SCHEMA: &str = r#"[
[66,0,"a",[[1,0,"x",1],[1,0,"y",2]]],
[66,0,"b",[[1,0,"x",3],[66,0,"inner",[[2,0,"z",4]]]]],
[66,0,"c",[[129,0,"name","dev"]]]
]"#;

/// Minimal nested document: one struct `sub` with one uint8 leaf `x = 3`.
pub const NESTED_SCHEMA: &str = r#"[[66,0,"sub",[[1,0,"x",3]]]]"#;

/// Wraps a schema document into a `t` line.
pub fn schema_line(document: &str) -> String {
    format!("t 0 {}", flatten(document))
}

/// Builds an `l` line.
pub fn link_line(port: u32, first: usize, values: &[Value]) -> String {
    format!("l {port} {first} {}", Value::Array(values.to_vec()))
}

/// Builds a `u` line.
pub fn unlink_line(port: u32) -> String {
    format!("u {port}")
}

/// Builds an `E` line.
pub fn error_line(port: u32, code: u32, message: &str) -> String {
    format!("E {port} {code} {message}")
}

fn flatten(document: &str) -> String {
    document.lines().map(str::trim).collect()
}

/// Parses a document into a fresh tree rooted at `data`.
pub fn tree_from(document: &str) -> Tree {
    let mut tree = Tree::new("data");
    let root = tree.root();
    tree.parse_schema_str(root, document)
        .expect("fixture schema must parse");
    tree
}

/// One node as seen by [`snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    /// Dotted path.
    pub path: String,
    /// Type code.
    pub type_code: TypeCode,
    /// Display value.
    pub display: String,
}

/// Flattens a tree in pre-order, for structural comparisons.
pub fn snapshot(tree: &Tree) -> Vec<NodeSnapshot> {
    let mut out = Vec::new();
    tree.walk(tree.root(), &mut |_, node, path| {
        out.push(NodeSnapshot {
            path: path.join("."),
            type_code: node.type_code(),
            display: node.display_value(),
        });
    });
    out
}
