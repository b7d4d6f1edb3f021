//! Value nodes: the typed entries of the mirrored tree.
//!
//! Every node carries a validated value. Updates pass through
//! [`ValueNode::apply`], which rejects anything the variant cannot hold
//! and keeps the prior value in that case.

use crate::types::{BaseType, NodeKind, NodeOptions, ShowMode, TypeCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static NODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable handle of a node inside a [`Tree`](crate::Tree).
///
/// Handles carry a generation so a handle to a node freed by a schema
/// rebuild never resolves to whatever reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// The value held by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Finite number.
    Number(f64),
    /// Index into `labels`.
    Enum {
        /// Label list of the enum.
        labels: Vec<String>,
        /// Current index, always in range.
        index: usize,
    },
    /// Text.
    String(String),
    /// Ordered child handles of a struct.
    Struct(Vec<NodeId>),
}

/// A typed node of the value tree.
#[derive(Debug, Clone)]
pub struct ValueNode {
    id: u64,
    type_code: TypeCode,
    name: String,
    options: NodeOptions,
    value: NodeValue,
    pub(crate) parent: Option<NodeId>,
    pub(crate) idx: usize,
}

impl ValueNode {
    /// Creates a detached node of the given variant.
    ///
    /// `labels` is only used by enum nodes. The initial value is the
    /// variant's zero value.
    pub fn new(
        kind: NodeKind,
        type_code: TypeCode,
        name: impl Into<String>,
        options: NodeOptions,
        labels: Vec<String>,
    ) -> Self {
        let value = match kind {
            NodeKind::Number => NodeValue::Number(0.0),
            NodeKind::Enum => NodeValue::Enum { labels, index: 0 },
            NodeKind::String => NodeValue::String(String::new()),
            NodeKind::Struct => NodeValue::Struct(Vec::new()),
        };
        Self {
            id: NODE_COUNTER.fetch_add(1, Ordering::Relaxed),
            type_code,
            name: name.into(),
            options,
            value,
            parent: None,
            idx: 0,
        }
    }

    /// Creates an empty struct node.
    pub fn new_struct(name: impl Into<String>) -> Self {
        Self::new(
            NodeKind::Struct,
            TypeCode::STRUCT,
            name,
            NodeOptions::empty(),
            Vec::new(),
        )
    }

    /// Process-wide creation counter, for debugging only.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the type code.
    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Returns the base type of the type code.
    pub fn base_type(&self) -> BaseType {
        self.type_code.base_type()
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the option flags.
    pub fn options(&self) -> NodeOptions {
        self.options
    }

    /// Returns the current value.
    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Returns the parent handle, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Position inside the parent's child list.
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Returns the node variant.
    pub fn kind(&self) -> NodeKind {
        match self.value {
            NodeValue::Number(_) => NodeKind::Number,
            NodeValue::Enum { .. } => NodeKind::Enum,
            NodeValue::String(_) => NodeKind::String,
            NodeValue::Struct(_) => NodeKind::Struct,
        }
    }

    /// Returns true for struct nodes.
    pub fn is_struct(&self) -> bool {
        matches!(self.value, NodeValue::Struct(_))
    }

    /// Returns true if the readonly option is set.
    pub fn readonly(&self) -> bool {
        self.options.readonly()
    }

    /// Leaves are editable unless readonly; structs never are.
    pub fn editable(&self) -> bool {
        !self.is_struct() && !self.readonly()
    }

    /// Child handles of a struct; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.value {
            NodeValue::Struct(children) => children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.value {
            NodeValue::Struct(children) => Some(children),
            _ => None,
        }
    }

    /// Returns the number if this is a number node.
    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            NodeValue::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the index if this is an enum node.
    pub fn enum_index(&self) -> Option<usize> {
        match self.value {
            NodeValue::Enum { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Returns the labels if this is an enum node.
    pub fn enum_labels(&self) -> Option<&[String]> {
        match &self.value {
            NodeValue::Enum { labels, .. } => Some(labels),
            _ => None,
        }
    }

    /// Returns the text if this is a string node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Applies an update through the variant's validation.
    ///
    /// Returns true if the update was accepted. Rejected updates leave the
    /// prior value untouched. Structs accept nothing.
    pub fn apply(&mut self, input: &Value) -> bool {
        match &mut self.value {
            NodeValue::Number(current) => match parse_number(input) {
                Some(v) => {
                    *current = v;
                    true
                }
                None => false,
            },
            NodeValue::Enum { labels, index } => match resolve_enum(labels, input) {
                Some(i) => {
                    *index = i;
                    true
                }
                None => false,
            },
            NodeValue::String(current) => match input {
                Value::String(s) => {
                    current.clone_from(s);
                    true
                }
                Value::Number(n) => {
                    *current = n.to_string();
                    true
                }
                Value::Bool(b) => {
                    *current = b.to_string();
                    true
                }
                _ => false,
            },
            NodeValue::Struct(_) => false,
        }
    }

    /// Value as sent upstream in a `path=value` edit.
    ///
    /// Enums travel as their index.
    pub fn wire_value(&self) -> String {
        match &self.value {
            NodeValue::Number(v) => v.to_string(),
            NodeValue::Enum { index, .. } => index.to_string(),
            NodeValue::String(s) => s.clone(),
            NodeValue::Struct(_) => String::new(),
        }
    }

    /// Human readable rendering of the value.
    pub fn display_value(&self) -> String {
        match &self.value {
            NodeValue::Number(v) => format_number(*v, self.options.show_mode()),
            NodeValue::Enum { labels, index } => labels.get(*index).cloned().unwrap_or_default(),
            NodeValue::String(s) => s.clone(),
            NodeValue::Struct(children) if children.is_empty() => "NULL".to_string(),
            NodeValue::Struct(_) => ">".to_string(),
        }
    }
}

fn parse_number(input: &Value) -> Option<f64> {
    let v = match input {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn resolve_enum(labels: &[String], input: &Value) -> Option<usize> {
    let candidate = match input {
        Value::String(s) => match labels.iter().position(|l| l == s) {
            Some(i) => i,
            None => s.trim().parse::<usize>().ok()?,
        },
        Value::Number(n) => usize::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    (candidate < labels.len()).then_some(candidate)
}

fn format_number(v: f64, mode: Option<ShowMode>) -> String {
    let integral = v.fract() == 0.0 && v.abs() < 9.0e15;
    match mode {
        Some(ShowMode::Hex) if integral => format!("0x{:x}", v as i64),
        Some(ShowMode::Bin) if integral => format!("0b{:b}", v as i64),
        _ => v.to_string(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn number_value_stays_finite(start in -1.0e9f64..1.0e9, input in ".{0,12}") {
            let mut node = ValueNode::new(
                NodeKind::Number,
                TypeCode::FLOAT64,
                "f",
                NodeOptions::empty(),
                Vec::new(),
            );
            prop_assert!(node.apply(&Value::from(start)));
            let accepted = node.apply(&Value::String(input.clone()));
            let value = node.as_number().unwrap_or(f64::NAN);
            prop_assert!(value.is_finite());
            if !accepted {
                prop_assert_eq!(value, start);
            }
        }

        #[test]
        fn enum_index_stays_in_range(labels in prop::collection::vec("[a-z]{1,6}", 1..6), input in any::<i64>()) {
            let len = labels.len();
            let mut node = ValueNode::new(NodeKind::Enum, TypeCode::ENUM8, "e", NodeOptions::empty(), labels);
            let accepted = node.apply(&Value::from(input));
            let index = node.enum_index().unwrap_or(usize::MAX);
            prop_assert!(index < len);
            prop_assert_eq!(accepted, input >= 0 && (input as u64) < len as u64);
        }
    }
}
