//! Error types for data sources.

use thiserror::Error;

/// Result type for data source operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors a data source may report. "No matching records" is never an
/// error: `find` returns empty data and `find_one` returns `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Backend unreachable or request failed in flight.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed filter, sort or paging parameters.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Create with an id that already exists.
    #[error("conflict: {resource}/{id} already exists")]
    Conflict { resource: String, id: String },

    /// Update of a missing record.
    #[error("not found: {resource}/{id}")]
    NotFound { resource: String, id: String },

    /// Optional capability called without feature detection.
    #[error("capability not supported: {0}")]
    Unsupported(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl DataError {
    pub(crate) fn not_found(resource: &str, id: &str) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}
