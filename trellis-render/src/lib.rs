//! Render pipeline for Trellis.
//!
//! Turns a [`SchemaNode`](trellis_schema::SchemaNode) tree into an
//! [`Element`](trellis_registry::Element) tree: responsive attributes are
//! resolved for the active breakpoint, visibility conditions are evaluated,
//! data bindings are fetched through a [`DataSource`](trellis_data::DataSource)
//! and every node is dispatched to the renderer its type tag is registered
//! under.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use trellis_registry::{BuiltinComponents, ComponentRegistry};
//! use trellis_render::{RenderContext, RenderPipeline};
//! use trellis_schema::{Breakpoint, SchemaNode};
//!
//! let registry = ComponentRegistry::new();
//! registry.install(&BuiltinComponents).unwrap();
//! let pipeline = RenderPipeline::builder(Arc::new(registry)).build();
//!
//! let grid = SchemaNode::from_value(json!({
//!     "type": "grid",
//!     "columns": { "xs": 1, "lg": 3 }
//! })).unwrap();
//!
//! let lg = pipeline.resolve_props(&grid, &RenderContext::new(Breakpoint::Lg));
//! assert_eq!(lg.props["columns"], json!(3));
//! let sm = pipeline.resolve_props(&grid, &RenderContext::new(Breakpoint::Sm));
//! assert_eq!(sm.props["columns"], json!(1));
//! ```
//!
//! Long-lived views go through [`RenderPipeline::mount`], which runs the
//! pass on the tokio runtime and drops results that arrive after the view
//! was re-rendered or torn down.

mod config;
mod context;
mod error;
mod observer;
mod pipeline;
mod props;
mod session;
mod state;
mod view;

pub use config::{RenderConfig, DEFAULT_CONFIG_FILE};
pub use context::RenderContext;
pub use error::{RenderError, RenderResult};
pub use observer::{RecordingObserver, RenderObserver};
pub use pipeline::{RenderPipeline, RenderPipelineBuilder, ROOT_KEY};
pub use props::{resolve_props, ResolvedProps};
pub use session::{Generation, GenerationCounter, RenderSession};
pub use state::{NodeState, StateTable};
pub use view::MountedView;
