//! Evaluator front door: parse cache, condition fallbacks, templates.

use crate::ast::Expr;
use crate::context::ExprContext;
use crate::error::{ExprError, ExprResult};
use crate::eval::{display_string, eval, is_truthy};
use crate::parser::parse;
use crate::template::{self, Segment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

const DEFAULT_CACHE_CAPACITY: usize = 256;

/// How loudly expression failures are reported. Both modes fail open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionMode {
    /// Failures are logged at `debug`.
    #[default]
    Lenient,
    /// Failures are logged at `warn` and surfaced as diagnostics by the renderer.
    Strict,
}

/// Which conditional attribute an expression came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    VisibleOn,
    HiddenOn,
    DisabledOn,
}

impl ConditionKind {
    /// Value used when the expression cannot be evaluated: visible, not
    /// hidden, not disabled.
    pub const fn fallback(self) -> bool {
        matches!(self, Self::VisibleOn)
    }

    /// Schema attribute name.
    pub const fn attribute(self) -> &'static str {
        match self {
            Self::VisibleOn => "visibleOn",
            Self::HiddenOn => "hiddenOn",
            Self::DisabledOn => "disabledOn",
        }
    }
}

/// Result of a condition evaluation. `error` is set when `value` is the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionOutcome {
    pub value: bool,
    pub error: Option<ExprError>,
}

impl ConditionOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

type Compiled = Result<Arc<Expr>, ExprError>;

#[derive(Debug, Default)]
struct ExprCache {
    entries: HashMap<String, Compiled>,
    order: VecDeque<String>,
}

/// Evaluates expressions with a bounded cache of parsed sources.
#[derive(Debug)]
pub struct Evaluator {
    mode: ExpressionMode,
    capacity: usize,
    cache: Mutex<ExprCache>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            mode: ExpressionMode::default(),
            capacity: DEFAULT_CACHE_CAPACITY,
            cache: Mutex::new(ExprCache::default()),
        }
    }

    pub fn with_mode(mut self, mode: ExpressionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Maximum number of parsed sources kept. Zero disables caching.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn mode(&self) -> ExpressionMode {
        self.mode
    }

    /// Number of sources currently cached.
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Parses `source`, accepting an optional `${ … }` wrapper.
    pub fn compile(&self, source: &str) -> ExprResult<Arc<Expr>> {
        let source = template::strip_wrapper(source);
        if self.capacity == 0 {
            return parse(source).map(Arc::new);
        }

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.entries.get(source) {
            return hit.clone();
        }

        let compiled = parse(source).map(Arc::new);
        while cache.entries.len() >= self.capacity {
            let Some(oldest) = cache.order.pop_front() else {
                break;
            };
            cache.entries.remove(&oldest);
        }
        cache.order.push_back(source.to_string());
        cache.entries.insert(source.to_string(), compiled.clone());
        compiled
    }

    /// Evaluates `source` to a JSON value.
    pub fn eval_value(&self, source: &str, ctx: &ExprContext) -> ExprResult<Value> {
        let expr = self.compile(source)?;
        eval(&expr, ctx).map(|value| value.into_owned())
    }

    /// Evaluates `source` and applies truthiness.
    pub fn evaluate(&self, source: &str, ctx: &ExprContext) -> ExprResult<bool> {
        let expr = self.compile(source)?;
        eval(&expr, ctx).map(|value| is_truthy(&value))
    }

    /// Evaluates a conditional attribute. Never fails: errors yield the
    /// kind's fallback and are reported in the outcome.
    pub fn condition(&self, kind: ConditionKind, source: &str, ctx: &ExprContext) -> ConditionOutcome {
        match self.evaluate(source, ctx) {
            Ok(value) => ConditionOutcome { value, error: None },
            Err(error) => {
                let fallback = kind.fallback();
                match self.mode {
                    ExpressionMode::Lenient => debug!(
                        attribute = kind.attribute(),
                        expression = source,
                        error = %error,
                        fallback,
                        "Expression failed, using fallback"
                    ),
                    ExpressionMode::Strict => warn!(
                        attribute = kind.attribute(),
                        expression = source,
                        error = %error,
                        fallback,
                        "Expression failed, using fallback"
                    ),
                }
                ConditionOutcome {
                    value: fallback,
                    error: Some(error),
                }
            }
        }
    }

    /// Replaces every `${…}` placeholder with the display form of its value.
    pub fn interpolate(&self, template: &str, ctx: &ExprContext) -> ExprResult<String> {
        let mut out = String::with_capacity(template.len());
        for segment in template::segments(template) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(source) => out.push_str(&display_string(&self.eval_value(source, ctx)?)),
            }
        }
        Ok(out)
    }

    /// Like [`interpolate`](Self::interpolate), but a template that is a
    /// single placeholder keeps the value's JSON type. Strings without
    /// placeholders pass through.
    pub fn resolve_template(&self, template: &str, ctx: &ExprContext) -> ExprResult<Value> {
        match template::segments(template).as_slice() {
            [Segment::Expr(source)] => self.eval_value(source, ctx),
            segments if segments.iter().all(|s| matches!(s, Segment::Text(_))) => {
                Ok(Value::String(template.to_string()))
            }
            _ => self.interpolate(template, ctx).map(Value::String),
        }
    }

    /// True if `text` contains a complete `${…}` placeholder.
    pub fn is_template(text: &str) -> bool {
        template::has_placeholder(text)
    }
}
