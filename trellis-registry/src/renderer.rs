//! The renderer seam: what a component implementation receives and returns.

use crate::element::{ComponentElement, Diagnostic, Element};
use crate::error::ComponentError;
use serde_json::{Map, Value};

/// Everything a renderer needs for one node. Props are fully resolved
/// (responsive values picked, templates interpolated, defaults applied) and
/// children are already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub type_tag: String,
    pub key: String,
    pub props: Map<String, Value>,
    /// Result of the node's data binding, if it declares one.
    pub data: Option<Value>,
    pub disabled: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub children: Vec<Element>,
}

impl RenderInput {
    pub fn new(type_tag: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            key: key.into(),
            props: Map::new(),
            data: None,
            disabled: false,
            diagnostics: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Wraps the input unchanged in a component element.
    pub fn into_element(self) -> Element {
        Element::Component(ComponentElement {
            type_tag: self.type_tag,
            key: self.key,
            props: self.props,
            data: self.data,
            disabled: self.disabled,
            diagnostics: self.diagnostics,
            children: self.children,
        })
    }
}

/// A component implementation.
pub trait ComponentRenderer: Send + Sync {
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError>;
}

impl<F> ComponentRenderer for F
where
    F: Fn(RenderInput) -> Result<Element, ComponentError> + Send + Sync,
{
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError> {
        self(input)
    }
}

/// Renders any node as a generic component element.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl ComponentRenderer for PassthroughRenderer {
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError> {
        Ok(input.into_element())
    }
}

/// Default fallback for unregistered type tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownComponent;

impl ComponentRenderer for UnknownComponent {
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError> {
        Ok(Element::Unknown {
            key: input.key,
            type_tag: input.type_tag,
        })
    }
}
