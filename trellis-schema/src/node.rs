//! The schema node: type tag, identity, attributes, conditions and children.

use crate::binding::DataBinding;
use crate::content::ChildContent;
use crate::error::{SchemaError, SchemaResult};
use crate::responsive;
use crate::Breakpoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Attribute holding a node's data binding.
pub const DATA_SOURCE_KEY: &str = "dataSource";

/// Type tag given to primitive values found inside a children array.
pub const TEXT_TYPE: &str = "text";

/// Type tag of a placeholder standing in for a child that failed to parse.
/// The `reason` attribute holds the parse error.
pub const MALFORMED_TYPE: &str = "$malformed";

const REASON_KEY: &str = "reason";

const TYPE_KEY: &str = "type";
const BODY_KEY: &str = "body";
const CHILDREN_KEY: &str = "children";

/// A conditional flag: a fixed boolean or a breakpoint-keyed set of booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum Flag {
    Fixed(bool),
    Responsive(Map<String, Value>),
}

impl Flag {
    /// The flag's value at `breakpoint`, or `None` if nothing is defined at this size.
    pub fn at(&self, breakpoint: Breakpoint) -> Option<bool> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::Responsive(map) => {
                responsive::resolve_map(map, breakpoint).and_then(Value::as_bool)
            }
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Fixed(value) => Value::Bool(*value),
            Self::Responsive(map) => Value::Object(map.clone()),
        }
    }
}

/// Visibility and enablement conditions lifted out of a node's attributes.
///
/// An explicit flag always takes precedence over its `…On` expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    pub visible: Option<Flag>,
    pub hidden: Option<Flag>,
    pub disabled: Option<Flag>,
    pub visible_on: Option<String>,
    pub hidden_on: Option<String>,
    pub disabled_on: Option<String>,
}

impl Conditions {
    /// Returns whether no condition is declared.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn write_into(&self, map: &mut Map<String, Value>) {
        let flags = [
            ("visible", &self.visible),
            ("hidden", &self.hidden),
            ("disabled", &self.disabled),
        ];
        for (key, flag) in flags {
            if let Some(flag) = flag {
                map.insert(key.to_string(), flag.to_value());
            }
        }
        let exprs = [
            ("visibleOn", &self.visible_on),
            ("hiddenOn", &self.hidden_on),
            ("disabledOn", &self.disabled_on),
        ];
        for (key, expr) in exprs {
            if let Some(expr) = expr {
                map.insert(key.to_string(), Value::String(expr.clone()));
            }
        }
    }
}

/// One unit of the declarative UI tree.
///
/// Built once per view from a JSON document and treated as immutable during a
/// render pass; edits produce a new tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Registry discriminator. Open set.
    pub node_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Type-specific attributes, possibly responsive.
    pub attributes: Map<String, Value>,
    pub conditions: Conditions,
    pub data_source: Option<DataBinding>,
    pub content: ChildContent,
}

impl SchemaNode {
    /// Creates a bare node of the given type.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            id: None,
            name: None,
            attributes: Map::new(),
            conditions: Conditions::default(),
            data_source: None,
            content: ChildContent::Empty,
        }
    }

    /// Creates a `text` node holding a primitive value.
    pub fn text(value: impl Into<Value>) -> Self {
        Self::new(TEXT_TYPE).with_attribute("value", value)
    }

    /// Creates the placeholder for a child that could not be parsed.
    pub fn malformed(error: &SchemaError) -> Self {
        Self::new(MALFORMED_TYPE).with_attribute(REASON_KEY, error.to_string())
    }

    /// Returns the parse error of a placeholder created by
    /// [`malformed`](Self::malformed).
    pub fn malformed_reason(&self) -> Option<&str> {
        if self.node_type != MALFORMED_TYPE {
            return None;
        }
        self.attributes.get(REASON_KEY).and_then(Value::as_str)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: SchemaNode) -> Self {
        match &mut self.content {
            ChildContent::Nodes(nodes) => nodes.push(child),
            _ => self.content = ChildContent::Nodes(vec![child]),
        }
        self
    }

    pub fn with_data_source(mut self, binding: DataBinding) -> Self {
        self.data_source = Some(binding);
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Parses and normalizes a JSON document.
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        parse_node(value, "$")
    }

    /// Parses and normalizes a JSON string.
    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Writes the node back out in canonical document form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(TYPE_KEY.to_string(), Value::String(self.node_type.clone()));
        if let Some(id) = &self.id {
            map.insert("id".to_string(), Value::String(id.clone()));
        }
        if let Some(name) = &self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        for (key, value) in &self.attributes {
            map.insert(key.clone(), value.clone());
        }
        self.conditions.write_into(&mut map);
        if let Some(binding) = &self.data_source {
            if let Ok(value) = serde_json::to_value(binding) {
                map.insert(DATA_SOURCE_KEY.to_string(), value);
            }
        }
        if let Some(children) = self.content.to_value() {
            map.insert(CHILDREN_KEY.to_string(), children);
        }
        Value::Object(map)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Child nodes, or an empty slice for leaf/empty content.
    pub fn children(&self) -> &[SchemaNode] {
        self.content.nodes()
    }

    /// Visits every node depth-first in document order with its depth.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SchemaNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a SchemaNode, usize)) {
        visit(self, depth);
        for child in self.children() {
            child.walk_at(depth + 1, visit);
        }
    }

    /// Finds the first node with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<&SchemaNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find_by_id(id))
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _| count += 1);
        count
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ================================================================
// Parsing
// ================================================================

/// Parses a node below the root. A child that fails to parse becomes a
/// [`MALFORMED_TYPE`] placeholder so its siblings survive.
pub(crate) fn parse_child(value: Value, path: &str) -> SchemaNode {
    parse_node(value, path).unwrap_or_else(|error| {
        warn!(path, error = %error, "Malformed child node replaced by placeholder");
        SchemaNode::malformed(&error)
    })
}

pub(crate) fn parse_node(value: Value, path: &str) -> SchemaResult<SchemaNode> {
    let Value::Object(mut map) = value else {
        return Err(SchemaError::NotAnObject {
            path: path.to_string(),
        });
    };

    let node_type = match map.remove(TYPE_KEY) {
        Some(Value::String(tag)) if !tag.is_empty() => tag,
        _ => {
            return Err(SchemaError::MissingType {
                path: path.to_string(),
            });
        }
    };

    let id = take_identity(&mut map, "id", path)?;
    let name = take_identity(&mut map, "name", path)?;
    let conditions = take_conditions(&mut map, path)?;

    let data_source = match map.remove(DATA_SOURCE_KEY) {
        None | Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value(value).map_err(|e| {
            SchemaError::InvalidAttribute {
                path: path.to_string(),
                attribute: DATA_SOURCE_KEY.to_string(),
                reason: e.to_string(),
            }
        })?),
    };

    let body = map.remove(BODY_KEY);
    let children = map.remove(CHILDREN_KEY);
    let content = match (body, children) {
        (Some(body), Some(_)) => {
            debug!(path, "node declares both `body` and `children`; using `body`");
            ChildContent::parse(body, &format!("{path}.{BODY_KEY}"))
        }
        (Some(body), None) => ChildContent::parse(body, &format!("{path}.{BODY_KEY}")),
        (None, Some(children)) => {
            ChildContent::parse(children, &format!("{path}.{CHILDREN_KEY}"))
        }
        (None, None) => ChildContent::Empty,
    };

    Ok(SchemaNode {
        node_type,
        id,
        name,
        attributes: map,
        conditions,
        data_source,
        content,
    })
}

fn take_identity(
    map: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> SchemaResult<Option<String>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(SchemaError::InvalidAttribute {
            path: path.to_string(),
            attribute: key.to_string(),
            reason: format!("expected string or number, got {other}"),
        }),
    }
}

fn take_conditions(map: &mut Map<String, Value>, path: &str) -> SchemaResult<Conditions> {
    let mut conditions = Conditions {
        visible_on: take_expression(map, "visibleOn", path)?,
        hidden_on: take_expression(map, "hiddenOn", path)?,
        disabled_on: take_expression(map, "disabledOn", path)?,
        ..Default::default()
    };

    let slots = [
        ("visible", &mut conditions.visible, &mut conditions.visible_on),
        ("hidden", &mut conditions.hidden, &mut conditions.hidden_on),
        ("disabled", &mut conditions.disabled, &mut conditions.disabled_on),
    ];
    for (key, flag, expr) in slots {
        match map.remove(key) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(value)) => *flag = Some(Flag::Fixed(value)),
            Some(Value::Object(obj))
                if responsive::is_responsive_map(&obj) && obj.values().all(Value::is_boolean) =>
            {
                *flag = Some(Flag::Responsive(obj));
            }
            // A string in flag position is an expression unless `…On` is also given.
            Some(Value::String(text)) if expr.is_none() => *expr = Some(text),
            Some(other) => {
                return Err(SchemaError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: key.to_string(),
                    reason: format!("expected boolean, got {other}"),
                });
            }
        }
    }
    Ok(conditions)
}

fn take_expression(
    map: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> SchemaResult<Option<String>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(expr)) => Ok(Some(expr)),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(SchemaError::InvalidAttribute {
            path: path.to_string(),
            attribute: key.to_string(),
            reason: format!("expected expression string, got {other}"),
        }),
    }
}
