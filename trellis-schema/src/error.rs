//! Error types for the schema model.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while normalizing a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A node has no `type`, or its `type` is not a non-empty string.
    #[error("node at {path} is missing a string `type`")]
    MissingType { path: String },

    /// A value in node position is not a JSON object.
    #[error("node at {path} is not an object")]
    NotAnObject { path: String },

    /// A reserved attribute has the wrong shape.
    #[error("invalid `{attribute}` at {path}: {reason}")]
    InvalidAttribute {
        path: String,
        attribute: String,
        reason: String,
    },

    /// A `$filter` predicate could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A breakpoint name outside `xs`..`2xl`.
    #[error("unknown breakpoint: {0}")]
    UnknownBreakpoint(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
