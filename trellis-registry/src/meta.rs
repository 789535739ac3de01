//! Declarative component metadata: label, category, inputs, defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Layout,
    Basic,
    Form,
    Data,
    Navigation,
    Media,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
    Object,
    Expression,
    #[default]
    Any,
}

/// One configurable input a component accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInput {
    pub name: String,
    #[serde(rename = "type", default)]
    pub input_type: InputType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ComponentInput {
    pub fn new(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            required: false,
            default_value: None,
            enum_values: Vec::new(),
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_type = InputType::Enum;
        self.enum_values = options.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMeta {
    pub label: String,
    #[serde(default)]
    pub category: ComponentCategory,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ComponentInput>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub default_props: Map<String, Value>,
    #[serde(default)]
    pub is_container: bool,
}

impl ComponentMeta {
    pub fn new(label: impl Into<String>, category: ComponentCategory) -> Self {
        Self {
            label: label.into(),
            category,
            ..Default::default()
        }
    }

    pub fn container(mut self) -> Self {
        self.is_container = true;
        self
    }

    pub fn with_input(mut self, input: ComponentInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_props.insert(key.into(), value.into());
        self
    }

    pub fn input(&self, name: &str) -> Option<&ComponentInput> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Fills in `defaultProps`, then per-input defaults, under the explicit
    /// props. Explicit values always win.
    pub fn apply_defaults(&self, props: &mut Map<String, Value>) {
        for (key, value) in &self.default_props {
            props.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for input in &self.inputs {
            if let Some(default) = &input.default_value {
                props
                    .entry(input.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }

    /// Required inputs that are absent or `null` in `props`.
    pub fn missing_required<'a>(&'a self, props: &Map<String, Value>) -> Vec<&'a str> {
        self.inputs
            .iter()
            .filter(|input| input.required)
            .filter(|input| props.get(&input.name).is_none_or(Value::is_null))
            .map(|input| input.name.as_str())
            .collect()
    }
}
