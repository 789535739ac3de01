//! Error types for the render pipeline.

use crate::state::NodeState;
use thiserror::Error;
use trellis_data::DataError;
use trellis_expr::ExprError;
use trellis_registry::ComponentError;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while rendering a node. None of these escape a render pass:
/// each is turned into an error placeholder for the failing subtree.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("maximum render depth exceeded ({0})")]
    DepthExceeded(usize),

    /// A child that failed to parse, carried as a placeholder node.
    #[error("malformed node: {0}")]
    MalformedNode(String),

    #[error("node declares a data source but no data source is configured")]
    NoDataSource,

    /// `resource`/`id` template of a data binding could not be resolved.
    #[error("invalid data binding: {0}")]
    Binding(#[source] ExprError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("node {key}: invalid transition {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: NodeState,
        to: NodeState,
    },
}
