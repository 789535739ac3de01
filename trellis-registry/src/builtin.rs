//! Builtin component package.
//!
//! Host-independent definitions of the common layout, form and data
//! components. Each renders to a generic [`ComponentElement`] carrying its
//! resolved props; a host toolkit maps those to widgets.
//!
//! [`ComponentElement`]: crate::ComponentElement

use crate::element::Element;
use crate::error::{ComponentError, RegistryResult};
use crate::meta::{ComponentCategory, ComponentInput, ComponentMeta, InputType};
use crate::plugin::ComponentPlugin;
use crate::registry::ComponentRegistry;
use crate::renderer::{ComponentRenderer, PassthroughRenderer, RenderInput};
use serde_json::Value;
use std::sync::Arc;

const MAX_GRID_COLUMNS: u64 = 12;

/// Registers `page`, `container`, `grid`, `flex`, `card`, `text`, `tpl`,
/// `form`, `input`, `button`, `table`, `list`, `tabs`, `divider` and `image`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinComponents;

impl BuiltinComponents {
    pub const ID: &'static str = "trellis.builtin";

    /// Type tags this package registers.
    pub fn type_tags() -> Vec<&'static str> {
        definitions().into_iter().map(|(tag, _, _)| tag).collect()
    }
}

impl ComponentPlugin for BuiltinComponents {
    fn id(&self) -> &str {
        Self::ID
    }

    fn register(&self, registry: &ComponentRegistry) -> RegistryResult<()> {
        for (tag, renderer, meta) in definitions() {
            registry.register_arc(tag, renderer, meta)?;
        }
        Ok(())
    }
}

/// Validates `columns` before rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRenderer;

impl ComponentRenderer for GridRenderer {
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError> {
        if let Some(columns) = input.prop("columns") {
            match columns.as_u64() {
                Some(n) if (1..=MAX_GRID_COLUMNS).contains(&n) => {}
                _ => {
                    return Err(ComponentError::invalid_props(
                        &input.type_tag,
                        format!("columns must be an integer between 1 and {MAX_GRID_COLUMNS}, got {columns}"),
                    ));
                }
            }
        }
        Ok(input.into_element())
    }
}

/// Validates the `columns` definition list.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

impl ComponentRenderer for TableRenderer {
    fn render(&self, input: RenderInput) -> Result<Element, ComponentError> {
        match input.prop("columns") {
            None | Some(Value::Array(_)) => Ok(input.into_element()),
            Some(other) => Err(ComponentError::invalid_props(
                &input.type_tag,
                format!("columns must be an array, got {other}"),
            )),
        }
    }
}

fn string(name: &str) -> ComponentInput {
    ComponentInput::new(name, InputType::String)
}

fn number(name: &str) -> ComponentInput {
    ComponentInput::new(name, InputType::Number)
}

fn definitions() -> Vec<(&'static str, Arc<dyn ComponentRenderer>, ComponentMeta)> {
    use ComponentCategory::{Basic, Data, Form, Layout, Media, Navigation};

    let generic: Arc<dyn ComponentRenderer> = Arc::new(PassthroughRenderer);

    vec![
        (
            "page",
            Arc::clone(&generic),
            ComponentMeta::new("Page", Layout)
                .container()
                .with_input(string("title")),
        ),
        (
            "container",
            Arc::clone(&generic),
            ComponentMeta::new("Container", Layout).container(),
        ),
        (
            "grid",
            Arc::new(GridRenderer),
            ComponentMeta::new("Grid", Layout)
                .container()
                .with_input(number("columns").with_default(1))
                .with_input(number("gap")),
        ),
        (
            "flex",
            Arc::clone(&generic),
            ComponentMeta::new("Flex", Layout)
                .container()
                .with_input(
                    string("direction")
                        .with_options(["row", "column"])
                        .with_default("row"),
                )
                .with_input(number("gap")),
        ),
        (
            "card",
            Arc::clone(&generic),
            ComponentMeta::new("Card", Layout)
                .container()
                .with_input(string("title"))
                .with_input(string("description")),
        ),
        (
            "text",
            Arc::clone(&generic),
            ComponentMeta::new("Text", Basic).with_input(ComponentInput::new("value", InputType::Any)),
        ),
        (
            "tpl",
            Arc::clone(&generic),
            ComponentMeta::new("Template", Basic).with_input(string("tpl").required()),
        ),
        (
            "form",
            Arc::clone(&generic),
            ComponentMeta::new("Form", Form)
                .container()
                .with_input(string("title"))
                .with_input(string("submitText").with_default("Submit"))
                .with_input(string("mode").with_options(["normal", "horizontal", "inline"])),
        ),
        (
            "input",
            Arc::clone(&generic),
            ComponentMeta::new("Input", Form)
                .with_input(string("name").required())
                .with_input(string("label"))
                .with_input(
                    string("inputType")
                        .with_options(["text", "number", "email", "password", "date"])
                        .with_default("text"),
                )
                .with_input(string("placeholder")),
        ),
        (
            "button",
            Arc::clone(&generic),
            ComponentMeta::new("Button", Basic)
                .with_input(string("label").required())
                .with_input(
                    string("level")
                        .with_options(["default", "primary", "danger", "link"])
                        .with_default("default"),
                )
                .with_input(string("actionType")),
        ),
        (
            "table",
            Arc::new(TableRenderer),
            ComponentMeta::new("Table", Data)
                .with_input(ComponentInput::new("columns", InputType::Array).required())
                .with_input(number("pageSize").with_default(20)),
        ),
        (
            "list",
            Arc::clone(&generic),
            ComponentMeta::new("List", Data)
                .container()
                .with_input(string("title"))
                .with_input(string("itemKey").with_default("id")),
        ),
        (
            "tabs",
            Arc::clone(&generic),
            ComponentMeta::new("Tabs", Navigation)
                .container()
                .with_input(string("activeKey")),
        ),
        ("divider", Arc::clone(&generic), ComponentMeta::new("Divider", Basic)),
        (
            "image",
            generic,
            ComponentMeta::new("Image", Media)
                .with_input(string("src").required())
                .with_input(string("alt"))
                .with_input(number("width"))
                .with_input(number("height")),
        ),
    ]
}
