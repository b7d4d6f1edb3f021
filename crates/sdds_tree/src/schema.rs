//! Schema documents and descriptor normalization.
//!
//! A schema document is either a bare descriptor list or an object
//! `{"d": [...], "e": [[...], ...]}` whose `e` entry is a dictionary of
//! enum label lists shared by index. Each descriptor comes in one of two
//! encodings:
//!
//! - compact positional: `[type, opt, name, value]`, where enum
//!   descriptors carry their labels (inline list or dictionary index) in
//!   the fourth slot and start at index 0
//! - verbose keyed: `{"type", "opt", "name", "value", "enums"}` or the
//!   short aliases `{"t", "o", "n", "v", "e"}`
//!
//! Both normalize into a [`Descriptor`] before a node is built.

use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, ValueNode};
use crate::tree::Tree;
use crate::types::{NodeKind, NodeOptions, TypeCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Where an enum descriptor takes its labels from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnumSource {
    /// Labels carried by the descriptor itself.
    Inline(Vec<String>),
    /// Index into the document's shared dictionary.
    Shared(usize),
}

/// Canonical record of one node descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Type code.
    pub type_code: TypeCode,
    /// Option flags.
    pub options: NodeOptions,
    /// Node name.
    pub name: String,
    /// Initial value, or the child descriptor list for structs.
    pub value: Value,
    /// Enum label source, if any.
    pub enums: Option<EnumSource>,
}

#[derive(Deserialize)]
struct KeyedDescriptor {
    #[serde(rename = "type", alias = "t")]
    type_code: u8,
    #[serde(alias = "o", default)]
    opt: u8,
    #[serde(alias = "n")]
    name: String,
    #[serde(alias = "v", default = "zero")]
    value: Value,
    #[serde(alias = "e", default)]
    enums: Option<EnumSource>,
}

fn zero() -> Value {
    Value::from(0)
}

impl Descriptor {
    /// Normalizes a raw descriptor in either encoding.
    pub fn normalize(raw: &Value) -> TreeResult<Self> {
        match raw {
            Value::Array(items) => Self::from_positional(items),
            Value::Object(_) => {
                let keyed: KeyedDescriptor = serde_json::from_value(raw.clone()).map_err(|e| {
                    let name = raw
                        .get("name")
                        .or_else(|| raw.get("n"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    TreeError::invalid_descriptor(name, e.to_string())
                })?;
                Ok(Self {
                    type_code: TypeCode::new(keyed.type_code),
                    options: NodeOptions::from_bits_retain(keyed.opt),
                    name: keyed.name,
                    value: keyed.value,
                    enums: keyed.enums,
                })
            }
            other => Err(TreeError::invalid_descriptor(
                "",
                format!("expected list or object, got {other}"),
            )),
        }
    }

    fn from_positional(items: &[Value]) -> TreeResult<Self> {
        let name = items
            .get(2)
            .and_then(Value::as_str)
            .ok_or_else(|| TreeError::invalid_descriptor("", "missing name in slot 2"))?
            .to_string();
        let byte = |slot: usize, what: &str| {
            items
                .get(slot)
                .and_then(Value::as_u64)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| TreeError::invalid_descriptor(&name, format!("invalid {what}")))
        };
        let type_code = TypeCode::new(byte(0, "type")?);
        let options = NodeOptions::from_bits_retain(byte(1, "opt")?);
        let fourth = items.get(3).cloned();

        if type_code == TypeCode::ENUM8 {
            let enums = match fourth {
                None | Some(Value::Null) => None,
                Some(v) => Some(serde_json::from_value(v).map_err(|e| {
                    TreeError::invalid_descriptor(&name, format!("invalid enum labels: {e}"))
                })?),
            };
            return Ok(Self {
                type_code,
                options,
                name,
                value: zero(),
                enums,
            });
        }

        Ok(Self {
            type_code,
            options,
            name,
            value: fourth.unwrap_or_else(zero),
            enums: None,
        })
    }
}

/// A parsed schema document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaDocument {
    /// Top level raw descriptors.
    pub descriptors: Vec<Value>,
    /// Shared enum label dictionary.
    pub enums: Vec<Vec<String>>,
}

impl SchemaDocument {
    /// Parses schema text.
    pub fn parse(text: &str) -> TreeResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Accepts either top level encoding.
    pub fn from_value(value: Value) -> TreeResult<Self> {
        match value {
            Value::Array(descriptors) => Ok(Self {
                descriptors,
                enums: Vec::new(),
            }),
            Value::Object(mut map) => {
                let descriptors = match map.remove("d") {
                    Some(Value::Array(d)) => d,
                    _ => return Err(TreeError::invalid_document("missing descriptor list \"d\"")),
                };
                let enums = match map.remove("e") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(e) => serde_json::from_value(e).map_err(|err| {
                        TreeError::invalid_document(format!("invalid enum dictionary: {err}"))
                    })?,
                };
                Ok(Self { descriptors, enums })
            }
            other => Err(TreeError::invalid_document(format!(
                "expected list or object, got {other}"
            ))),
        }
    }

    fn labels_for(&self, descriptor: &Descriptor) -> TreeResult<Vec<String>> {
        match &descriptor.enums {
            None => Ok(Vec::new()),
            Some(EnumSource::Inline(labels)) => Ok(labels.clone()),
            Some(EnumSource::Shared(index)) => {
                self.enums
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| TreeError::UnknownEnumList {
                        index: *index,
                        name: descriptor.name.clone(),
                    })
            }
        }
    }
}

impl Tree {
    /// Replaces all children of `target` with the nodes described by `document`.
    ///
    /// On failure the partially built children are discarded and `target`
    /// is left empty. On success the target's observers are notified and
    /// the number of created nodes is returned.
    pub fn parse_schema(&mut self, target: NodeId, document: &SchemaDocument) -> TreeResult<usize> {
        self.clear_children(target)?;
        match self.build(target, &document.descriptors, document) {
            Ok(created) => {
                debug!(created, "schema parsed");
                self.notify(target);
                Ok(created)
            }
            Err(err) => {
                debug!(error = %err, "schema rebuild aborted");
                self.clear_children(target)?;
                Err(err)
            }
        }
    }

    /// Parses schema text and rebuilds `target` from it.
    pub fn parse_schema_str(&mut self, target: NodeId, text: &str) -> TreeResult<usize> {
        match SchemaDocument::parse(text) {
            Ok(document) => self.parse_schema(target, &document),
            Err(err) => {
                self.clear_children(target)?;
                Err(err)
            }
        }
    }

    fn build(&mut self, parent: NodeId, raw: &[Value], document: &SchemaDocument) -> TreeResult<usize> {
        let mut created = 0;
        for entry in raw {
            let descriptor = Descriptor::normalize(entry)?;
            let kind = descriptor
                .type_code
                .kind()
                .ok_or_else(|| TreeError::UnknownType {
                    code: descriptor.type_code.code(),
                    name: descriptor.name.clone(),
                })?;
            let labels = match kind {
                NodeKind::Enum => document.labels_for(&descriptor)?,
                _ => Vec::new(),
            };
            let mut node = ValueNode::new(
                kind,
                descriptor.type_code,
                descriptor.name.clone(),
                descriptor.options,
                labels,
            );
            if kind != NodeKind::Struct {
                node.apply(&descriptor.value);
            }
            let id = self.push_child(parent, node)?;
            created += 1;

            if kind == NodeKind::Struct {
                let Value::Array(children) = &descriptor.value else {
                    return Err(TreeError::invalid_descriptor(
                        &descriptor.name,
                        "struct value must be a descriptor list",
                    ));
                };
                created += self.build(id, children, document)?;
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> (Tree, TreeResult<usize>) {
        let mut tree = Tree::new("data");
        let root = tree.root();
        let result = tree.parse_schema_str(root, text);
        (tree, result)
    }

    #[test]
    fn compact_nested_struct() {
        let (tree, result) = parse(r#"[[66,0,"sub",[[1,0,"x",3]]]]"#);
        assert_eq!(result.unwrap(), 2);

        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        let sub = tree.children(root)[0];
        assert_eq!(tree.get(sub).unwrap().name(), "sub");
        assert!(tree.get(sub).unwrap().is_struct());

        let x = tree.find("sub.x").unwrap();
        let node = tree.get(x).unwrap();
        assert_eq!(node.type_code(), TypeCode::UINT8);
        assert_eq!(node.as_number(), Some(3.0));
        assert_eq!(tree.path_string(x), "sub.x");
    }

    #[test]
    fn verbose_full_keys() {
        let text = r#"[
            {"type":49,"opt":0,"name":"cntSwitch","value":"off","enums":["on","off"]},
            {"type":1,"opt":1,"name":"Fcnt","value":5},
            {"type":129,"opt":0,"name":"label","value":"hello"},
            {"type":36,"opt":0,"name":"value","value":7.5}
        ]"#;
        let (tree, result) = parse(text);
        assert_eq!(result.unwrap(), 4);

        let switch = tree.get(tree.find("cntSwitch").unwrap()).unwrap();
        assert_eq!(switch.enum_index(), Some(1));
        assert_eq!(switch.display_value(), "off");

        let cnt = tree.get(tree.find("Fcnt").unwrap()).unwrap();
        assert!(cnt.readonly());
        assert_eq!(cnt.as_number(), Some(5.0));

        assert_eq!(
            tree.get(tree.find("label").unwrap()).unwrap().as_text(),
            Some("hello")
        );
        assert_eq!(
            tree.get(tree.find("value").unwrap()).unwrap().as_number(),
            Some(7.5)
        );
    }

    #[test]
    fn verbose_short_aliases_default_missing_fields() {
        let (tree, result) = parse(r#"[{"t":1,"n":"a"},{"t":49,"n":"b","e":["x","y"],"v":1}]"#);
        assert_eq!(result.unwrap(), 2);
        let a = tree.get(tree.find("a").unwrap()).unwrap();
        assert_eq!(a.as_number(), Some(0.0));
        assert_eq!(a.options(), NodeOptions::empty());
        let b = tree.get(tree.find("b").unwrap()).unwrap();
        assert_eq!(b.enum_index(), Some(1));
    }

    #[test]
    fn shared_enum_dictionary() {
        let text = r#"{"d":[[49,0,"led",0],[49,0,"mode",1],{"t":49,"n":"other","e":0,"v":"off"}],
                       "e":[["on","off"],["auto","manual","off"]]}"#;
        let (tree, result) = parse(text);
        assert_eq!(result.unwrap(), 3);

        let led = tree.get(tree.find("led").unwrap()).unwrap();
        assert_eq!(led.enum_labels().unwrap(), ["on", "off"]);
        assert_eq!(led.enum_index(), Some(0));

        let mode = tree.get(tree.find("mode").unwrap()).unwrap();
        assert_eq!(mode.enum_labels().unwrap().len(), 3);

        let other = tree.get(tree.find("other").unwrap()).unwrap();
        assert_eq!(other.enum_index(), Some(1));
    }

    #[test]
    fn compact_inline_enum_labels() {
        let (tree, result) = parse(r#"[[49,0,"led",["on","off"]]]"#);
        assert_eq!(result.unwrap(), 1);
        let led = tree.get(tree.find("led").unwrap()).unwrap();
        assert_eq!(led.enum_labels().unwrap(), ["on", "off"]);
        assert_eq!(led.enum_index(), Some(0));
    }

    #[test]
    fn malformed_initial_value_is_dropped() {
        let (tree, result) = parse(r#"[[1,0,"n","abc"],[49,0,"e",["a"]]]"#);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(tree.get(tree.find("n").unwrap()).unwrap().as_number(), Some(0.0));
    }

    #[test]
    fn unknown_type_aborts_rebuild() {
        let (tree, result) = parse(r#"[[1,0,"ok",1],[66,0,"s",[[51,0,"bad",0]]]]"#);
        assert!(matches!(result, Err(TreeError::UnknownType { code: 0x33, .. })));
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn unknown_enum_list_aborts() {
        let (tree, result) = parse(r#"{"d":[[49,0,"led",4]],"e":[["on"]]}"#);
        assert!(matches!(result, Err(TreeError::UnknownEnumList { index: 4, .. })));
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn invalid_json_clears_tree() {
        let mut tree = Tree::new("data");
        let root = tree.root();
        tree.parse_schema_str(root, r#"[[1,0,"x",1]]"#).unwrap();
        assert!(matches!(
            tree.parse_schema_str(root, "[[1,0,"),
            Err(TreeError::InvalidJson(_))
        ));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn struct_needs_descriptor_list() {
        let (_, result) = parse(r#"[[66,0,"s",5]]"#);
        assert!(matches!(result, Err(TreeError::InvalidDescriptor { .. })));
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(Descriptor::normalize(&json!({"type": 1, "opt": 0, "value": 1})).is_err());
        assert!(Descriptor::normalize(&json!([1, 0])).is_err());
        assert!(Descriptor::normalize(&json!("x")).is_err());
    }

    #[test]
    fn rebuild_keeps_root_identity() {
        let mut tree = Tree::new("data");
        let root = tree.root();
        tree.parse_schema_str(root, r#"[[1,0,"x",1]]"#).unwrap();
        let old = tree.find("x").unwrap();
        tree.parse_schema_str(root, r#"[[1,0,"x",2]]"#).unwrap();
        assert_eq!(tree.root(), root);
        assert!(!tree.contains(old));
        assert_eq!(tree.get(tree.find("x").unwrap()).unwrap().as_number(), Some(2.0));
    }
}
