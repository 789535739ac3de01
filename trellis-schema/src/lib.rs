//! Schema node model for Trellis.
//!
//! Defines the document types every other Trellis crate depends on:
//! - [`SchemaNode`]: one unit of the declarative UI tree (type tag, attributes, children)
//! - [`ChildContent`]: the normalized `body`/`children` shape (`Empty | Leaf | Nodes`)
//! - [`Conditions`]: `visible`/`hidden`/`disabled` flags and their expression counterparts
//! - [`Breakpoint`] and the [`responsive`] resolver for breakpoint-keyed values
//! - [`DataBinding`], [`QueryParams`], [`QueryResult`]: the request/response pair
//!   a data-bound node exchanges with a data source
//!
//! Schema documents are plain JSON. Parsing normalizes them once at the model
//! boundary so the render pipeline only ever sees one shape.

mod binding;
mod breakpoint;
mod content;
mod error;
mod node;
mod query;
pub mod responsive;

pub use binding::DataBinding;
pub use breakpoint::Breakpoint;
pub use content::ChildContent;
pub use error::{SchemaError, SchemaResult};
pub use node::{Conditions, Flag, SchemaNode, DATA_SOURCE_KEY, MALFORMED_TYPE, TEXT_TYPE};
pub use query::{
    compare_values, lookup_field, values_equal, Filter, FilterOp, QueryParams, QueryResult,
    SortField, SortOrder,
};
