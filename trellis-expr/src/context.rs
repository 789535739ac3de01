//! Ambient scope an expression is evaluated against.

use serde_json::{Map, Value};
use std::borrow::Cow;
use trellis_schema::Breakpoint;

/// Variables visible to an expression.
///
/// Root identifiers resolve in this order: the reserved names `data`,
/// `record`, `user`, `breakpoint` and `vars`; then entries of `vars`; then
/// fields of the data scope. Anything else is undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprContext {
    pub data: Value,
    pub record: Value,
    pub user: Value,
    pub breakpoint: Breakpoint,
    pub vars: Map<String, Value>,
}

impl ExprContext {
    pub fn new(breakpoint: Breakpoint) -> Self {
        Self {
            data: Value::Object(Map::new()),
            record: Value::Null,
            user: Value::Null,
            breakpoint,
            vars: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_record(mut self, record: Value) -> Self {
        self.record = record;
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = user;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    /// Resolves a root identifier, or `None` if nothing by that name is in scope.
    pub fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            "data" => return Some(Cow::Borrowed(&self.data)),
            "record" => return Some(Cow::Borrowed(&self.record)),
            "user" => return Some(Cow::Borrowed(&self.user)),
            "breakpoint" => {
                return Some(Cow::Owned(Value::String(self.breakpoint.name().to_string())));
            }
            "vars" => return Some(Cow::Owned(Value::Object(self.vars.clone()))),
            _ => {}
        }
        self.vars
            .get(name)
            .or_else(|| self.data.as_object().and_then(|fields| fields.get(name)))
            .map(Cow::Borrowed)
    }
}
