//! Rendered output tree.
//!
//! Renderers produce [`Element`]s; the pipeline assembles them into the tree
//! a host toolkit turns into widgets. Every element carries the key of the
//! schema node it came from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A non-fatal problem recorded against a rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Attribute the problem came from, e.g. `hiddenOn`.
    pub attribute: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentElement {
    pub type_tag: String,
    pub key: String,
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Element {
    Component(ComponentElement),
    Text {
        key: String,
        text: String,
    },
    /// Placeholder while a data-bound node waits for its fetch.
    Loading {
        key: String,
    },
    /// Placeholder for a failed subtree.
    Error {
        key: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Unknown {
        key: String,
        type_tag: String,
    },
}

impl Element {
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            key: key.into(),
            text: text.into(),
        }
    }

    pub fn loading(key: impl Into<String>) -> Self {
        Self::Loading { key: key.into() }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Component(component) => &component.key,
            Self::Text { key, .. }
            | Self::Loading { key }
            | Self::Error { key, .. }
            | Self::Unknown { key, .. } => key,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentElement> {
        match self {
            Self::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Element] {
        match self {
            Self::Component(component) => &component.children,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Depth-first search by key.
    pub fn find(&self, key: &str) -> Option<&Element> {
        if self.key() == key {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(key))
    }

    /// Replaces the first element with the given key, depth-first. Returns
    /// whether a replacement happened.
    pub fn replace(&mut self, key: &str, replacement: Element) -> bool {
        self.replace_with(key, &mut Some(replacement))
    }

    fn replace_with(&mut self, key: &str, replacement: &mut Option<Element>) -> bool {
        if self.key() == key {
            if let Some(element) = replacement.take() {
                *self = element;
                return true;
            }
            return false;
        }
        match self {
            Self::Component(component) => component
                .children
                .iter_mut()
                .any(|child| child.replace_with(key, replacement)),
            _ => false,
        }
    }
}
