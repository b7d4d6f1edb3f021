//! Property-based test generators using proptest.
//!
//! Schema trees are generated once as [`GenNode`]s and rendered into
//! either document encoding, so the same tree can be fed through both
//! parsers.

use proptest::prelude::*;
use serde_json::{json, Value};

/// A generated descriptor tree.
#[derive(Debug, Clone, PartialEq)]
pub enum GenNode {
    /// Number leaf.
    Number {
        /// Type code from the number families.
        type_code: u8,
        /// Leaf name.
        name: String,
        /// Initial value.
        value: f64,
    },
    /// Enum leaf starting at its first label.
    Enum {
        /// Leaf name.
        name: String,
        /// Labels, never empty.
        labels: Vec<String>,
    },
    /// String leaf.
    Text {
        /// Leaf name.
        name: String,
        /// Initial text.
        value: String,
    },
    /// Struct with ordered children.
    Struct {
        /// Struct name.
        name: String,
        /// Child descriptors.
        children: Vec<GenNode>,
    },
}

const INT_CODES: [u8; 8] = [0x01, 0x02, 0x04, 0x08, 0x11, 0x12, 0x14, 0x18];
const FLOAT_CODES: [u8; 2] = [0x24, 0x28];

impl GenNode {
    /// Renders this node in the compact positional encoding.
    pub fn to_compact(&self) -> Value {
        match self {
            GenNode::Number {
                type_code,
                name,
                value,
            } => json!([type_code, 0, name, value]),
            GenNode::Enum { name, labels } => json!([0x31, 0, name, labels]),
            GenNode::Text { name, value } => json!([0x81, 0, name, value]),
            GenNode::Struct { name, children } => {
                let children: Vec<Value> = children.iter().map(GenNode::to_compact).collect();
                json!([0x42, 0, name, children])
            }
        }
    }

    /// Renders this node in the verbose keyed encoding, short aliases if `short`.
    pub fn to_verbose(&self, short: bool) -> Value {
        let (t, o, n, v) = if short {
            ("t", "o", "n", "v")
        } else {
            ("type", "opt", "name", "value")
        };
        let e = if short { "e" } else { "enums" };
        match self {
            GenNode::Number {
                type_code,
                name,
                value,
            } => json!({ t: type_code, o: 0, n: name, v: value }),
            GenNode::Enum { name, labels } => json!({ t: 0x31, o: 0, n: name, v: 0, e: labels }),
            GenNode::Text { name, value } => json!({ t: 0x81, o: 0, n: name, v: value }),
            GenNode::Struct { name, children } => {
                let children: Vec<Value> =
                    children.iter().map(|c| c.to_verbose(short)).collect();
                json!({ t: 0x42, o: 0, n: name, v: children })
            }
        }
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        match self {
            GenNode::Struct { children, .. } => 1 + children.iter().map(GenNode::count).sum::<usize>(),
            _ => 1,
        }
    }
}

/// Renders a descriptor list as a compact schema document.
pub fn render_compact(nodes: &[GenNode]) -> String {
    Value::Array(nodes.iter().map(GenNode::to_compact).collect()).to_string()
}

/// Renders a descriptor list as a verbose schema document.
pub fn render_verbose(nodes: &[GenNode], short: bool) -> String {
    Value::Array(nodes.iter().map(|n| n.to_verbose(short)).collect()).to_string()
}

/// Strategy for node names.
pub fn node_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for finite number values representable in every number type.
pub fn number_value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..256).prop_map(f64::from),
        (-4000i32..4000).prop_map(|v| f64::from(v) / 4.0),
    ]
}

/// Strategy for leaf descriptors.
pub fn leaf_strategy() -> impl Strategy<Value = GenNode> {
    prop_oneof![
        (prop::sample::select(INT_CODES.to_vec()), node_name_strategy(), 0u32..256).prop_map(
            |(type_code, name, value)| GenNode::Number {
                type_code,
                name,
                value: f64::from(value),
            }
        ),
        (prop::sample::select(FLOAT_CODES.to_vec()), node_name_strategy(), number_value_strategy())
            .prop_map(|(type_code, name, value)| GenNode::Number {
                type_code,
                name,
                value,
            }),
        (
            node_name_strategy(),
            prop::collection::vec(prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex"), 1..5)
        )
            .prop_map(|(name, labels)| GenNode::Enum { name, labels }),
        (node_name_strategy(), "[ -~]{0,16}").prop_map(|(name, value)| GenNode::Text { name, value }),
    ]
}

/// Strategy for a node, structs nested up to three levels.
pub fn node_strategy() -> impl Strategy<Value = GenNode> {
    leaf_strategy().prop_recursive(3, 48, 6, |inner| {
        (node_name_strategy(), prop::collection::vec(inner, 0..6))
            .prop_map(|(name, children)| GenNode::Struct { name, children })
    })
}

/// Strategy for a whole top level descriptor list.
pub fn schema_strategy() -> impl Strategy<Value = Vec<GenNode>> {
    prop::collection::vec(node_strategy(), 0..8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_encodings() {
        let nodes = vec![GenNode::Struct {
            name: "sub".into(),
            children: vec![GenNode::Number {
                type_code: 0x01,
                name: "x".into(),
                value: 3.0,
            }],
        }];
        assert_eq!(render_compact(&nodes), r#"[[66,0,"sub",[[1,0,"x",3.0]]]]"#);
        let verbose: Value = serde_json::from_str(&render_verbose(&nodes, false)).unwrap();
        assert_eq!(verbose[0]["name"], "sub");
        assert_eq!(verbose[0]["value"][0]["type"], 1);
        let short: Value = serde_json::from_str(&render_verbose(&nodes, true)).unwrap();
        assert_eq!(short[0]["n"], "sub");
        assert_eq!(nodes[0].count(), 2);
    }
}
