//! Normalized child content.

use crate::error::SchemaError;
use crate::node::{parse_child, SchemaNode};
use serde_json::Value;
use tracing::warn;

/// The single shape `body`/`children` normalize into.
///
/// Documents may give a node, a list of nodes, or a primitive. After parsing
/// the pipeline only deals with these three variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ChildContent {
    #[default]
    Empty,
    /// A primitive (string, number or boolean) rendered as text.
    Leaf(Value),
    /// Child nodes in document order. Never empty.
    Nodes(Vec<SchemaNode>),
}

impl ChildContent {
    pub(crate) fn parse(value: Value, path: &str) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Object(_) => Self::Nodes(vec![parse_child(value, path)]),
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    match item {
                        Value::Null => {}
                        Value::Object(_) => nodes.push(parse_child(item, &item_path)),
                        Value::Array(_) => {
                            let error = SchemaError::NotAnObject { path: item_path };
                            warn!(error = %error, "Nested array replaced by placeholder");
                            nodes.push(SchemaNode::malformed(&error));
                        }
                        primitive => nodes.push(SchemaNode::text(primitive)),
                    }
                }
                if nodes.is_empty() {
                    Self::Empty
                } else {
                    Self::Nodes(nodes)
                }
            }
            primitive => Self::Leaf(primitive),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Child nodes, or an empty slice.
    pub fn nodes(&self) -> &[SchemaNode] {
        match self {
            Self::Nodes(nodes) => nodes,
            _ => &[],
        }
    }

    /// The primitive value of leaf content.
    pub fn leaf(&self) -> Option<&Value> {
        match self {
            Self::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Leaf content rendered as display text.
    pub fn leaf_text(&self) -> Option<String> {
        self.leaf().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub(crate) fn to_value(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Leaf(value) => Some(value.clone()),
            Self::Nodes(nodes) => Some(Value::Array(
                nodes.iter().map(SchemaNode::to_value).collect(),
            )),
        }
    }
}
