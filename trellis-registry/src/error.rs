//! Error types for the component registry.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component not registered: {0}")]
    NotRegistered(String),

    #[error("invalid type tag: {0:?}")]
    InvalidTypeTag(String),

    #[error("component plugin already installed: {0}")]
    PluginAlreadyInstalled(String),

    #[error("component plugin '{plugin_id}' failed to register: {message}")]
    PluginFailed { plugin_id: String, message: String },
}

/// Error returned by a renderer. The pipeline turns it into an error
/// placeholder for the node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    #[error("invalid props for '{type_tag}': {reason}")]
    InvalidProps { type_tag: String, reason: String },

    #[error("render failed for '{type_tag}': {message}")]
    Failed { type_tag: String, message: String },
}

impl ComponentError {
    pub fn invalid_props(type_tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProps {
            type_tag: type_tag.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(type_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            type_tag: type_tag.into(),
            message: message.into(),
        }
    }
}
