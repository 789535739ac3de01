//! Component registry for Trellis.
//!
//! A [`ComponentRegistry`] maps schema type tags to [`ComponentRenderer`]
//! implementations plus declarative [`ComponentMeta`]. Lookups never fail:
//! an unknown tag resolves to a fallback renderer so a malformed node cannot
//! abort its siblings.
//!
//! ```
//! use trellis_registry::{BuiltinComponents, ComponentRegistry, Resolution};
//!
//! let registry = ComponentRegistry::new();
//! registry.install(&BuiltinComponents).unwrap();
//! assert!(registry.contains("grid"));
//! assert!(matches!(registry.resolve("no-such-widget"), Resolution::Unknown(_)));
//! ```

mod builtin;
mod element;
mod error;
mod meta;
mod plugin;
mod registry;
mod renderer;

pub use builtin::{BuiltinComponents, GridRenderer, TableRenderer};
pub use element::{ComponentElement, Diagnostic, Element};
pub use error::{ComponentError, RegistryError, RegistryResult};
pub use meta::{ComponentCategory, ComponentInput, ComponentMeta, InputType};
pub use plugin::ComponentPlugin;
pub use registry::{ComponentRegistry, RegistryEntry, Resolution};
pub use renderer::{ComponentRenderer, PassthroughRenderer, RenderInput, UnknownComponent};
