//! Ambient render context.

use serde_json::{Map, Value};
use trellis_expr::ExprContext;
use trellis_schema::{Breakpoint, QueryResult};

/// What a node is rendered against: the active breakpoint, the data and
/// record scopes, and the current user.
///
/// The breakpoint is injected by the host; the pipeline never observes a
/// viewport. Data-bound nodes hand their children a derived context.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    scope: ExprContext,
}

impl RenderContext {
    pub fn new(breakpoint: Breakpoint) -> Self {
        Self {
            scope: ExprContext::new(breakpoint),
        }
    }

    /// Replaces the data scope. Non-object values are ignored.
    pub fn with_data(mut self, data: Value) -> Self {
        if data.is_object() {
            self.scope.data = data;
        }
        self
    }

    pub fn with_record(mut self, record: Value) -> Self {
        self.scope.record = record;
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.scope.user = user;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.scope.vars.insert(name.into(), value);
        self
    }

    pub fn with_breakpoint(mut self, breakpoint: Breakpoint) -> Self {
        self.scope.breakpoint = breakpoint;
        self
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.scope.breakpoint
    }

    pub fn data(&self) -> &Value {
        &self.scope.data
    }

    pub fn record(&self) -> &Value {
        &self.scope.record
    }

    pub fn user(&self) -> &Value {
        &self.scope.user
    }

    /// Scope handed to the expression evaluator.
    pub fn expr(&self) -> &ExprContext {
        &self.scope
    }

    /// Context for the children of a node bound to a collection: `items`,
    /// `total` and `hasMore` are merged over the current data scope.
    pub fn with_collection(&self, result: &QueryResult) -> Self {
        let mut data = self.data_fields();
        data.insert("items".into(), Value::Array(result.data.clone()));
        data.insert("total".into(), result.total.map_or(Value::Null, Value::from));
        data.insert("hasMore".into(), result.has_more.map_or(Value::Null, Value::Bool));

        let mut child = self.clone();
        child.scope.data = Value::Object(data);
        child
    }

    /// Context for the children of a node bound to a single record: the
    /// record becomes the record scope and its fields merge into the data
    /// scope.
    pub fn with_found_record(&self, record: &Value) -> Self {
        let mut data = self.data_fields();
        if let Value::Object(fields) = record {
            data.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut child = self.clone();
        child.scope.data = Value::Object(data);
        child.scope.record = record.clone();
        child
    }

    fn data_fields(&self) -> Map<String, Value> {
        self.scope.data.as_object().cloned().unwrap_or_default()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Breakpoint::Md)
    }
}
