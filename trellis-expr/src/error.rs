//! Error types for expression evaluation.

use thiserror::Error;

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while lexing, parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected input `{fragment}` at offset {position}")]
    Lex { position: usize, fragment: String },

    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

impl ExprError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
