//! Sandboxed expression evaluator for Trellis.
//!
//! Schema nodes carry small expressions (`visibleOn`, `hiddenOn`,
//! `disabledOn`, `${…}` templates) that are evaluated against an ambient
//! [`ExprContext`] holding the current data scope, record, user and active
//! breakpoint. The language is a safe JavaScript-like subset: literals,
//! member access, arithmetic, comparisons, logical operators, a ternary and a
//! short whitelist of functions. Nothing reaches the host.
//!
//! # Failure policy
//!
//! [`Evaluator::condition`] never fails. When an expression cannot be
//! evaluated the result falls back per [`ConditionKind`]: visible, not hidden,
//! not disabled. Content is rendered rather than hidden on evaluator failure.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use trellis_expr::{ConditionKind, Evaluator, ExprContext};
//! use trellis_schema::Breakpoint;
//!
//! let evaluator = Evaluator::new();
//! let ctx = ExprContext::new(Breakpoint::Md).with_data(json!({"status": "open"}));
//!
//! assert!(evaluator.evaluate("status == 'open'", &ctx).unwrap());
//! let outcome = evaluator.condition(ConditionKind::HiddenOn, "missing.field", &ctx);
//! assert!(!outcome.value);
//! assert!(outcome.error.is_some());
//! ```

mod ast;
mod context;
mod error;
mod eval;
mod evaluator;
mod lexer;
mod parser;
mod template;

pub use ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use context::ExprContext;
pub use error::{ExprError, ExprResult};
pub use eval::{display_string, is_truthy};
pub use evaluator::{ConditionKind, ConditionOutcome, Evaluator, ExpressionMode};
pub use lexer::Token;
pub use parser::parse;
