//! Effective props of a node.
//!
//! [`resolve_props`] is a pure function of the node and its context. The
//! pipeline uses it for every node; config editors call it directly to
//! preview how a schema resolves at a given breakpoint.

use crate::context::RenderContext;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use trellis_expr::{ConditionKind, Evaluator, ExprError, ExpressionMode};
use trellis_registry::{ComponentMeta, Diagnostic};
use trellis_schema::{responsive, Conditions, Flag, SchemaNode};

/// Outcome of prop resolution for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProps {
    /// Attributes after responsive resolution, template interpolation and
    /// component defaults. Empty for invisible nodes.
    pub props: Map<String, Value>,
    pub visible: bool,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Required inputs absent from `props`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
}

impl ResolvedProps {
    fn hidden(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            props: Map::new(),
            visible: false,
            disabled: false,
            diagnostics,
            missing_required: Vec::new(),
        }
    }
}

/// Resolves visibility, enablement and props of `node` in `ctx`.
///
/// Visibility is decided first; props of an invisible node are not resolved.
/// `meta` supplies component defaults and required inputs when the node's
/// type is registered.
pub fn resolve_props(
    node: &SchemaNode,
    ctx: &RenderContext,
    evaluator: &Evaluator,
    meta: Option<&ComponentMeta>,
) -> ResolvedProps {
    let mut diagnostics = Vec::new();

    if !is_visible(&node.conditions, ctx, evaluator, &mut diagnostics) {
        return ResolvedProps::hidden(diagnostics);
    }
    let disabled = condition(
        node.conditions.disabled.as_ref(),
        node.conditions.disabled_on.as_deref(),
        ConditionKind::DisabledOn,
        ctx,
        evaluator,
        &mut diagnostics,
    );

    let mut props = responsive::resolve_attributes(&node.attributes, ctx.breakpoint());
    interpolate_props(&mut props, ctx, evaluator, &mut diagnostics);

    let missing_required = match meta {
        Some(meta) => {
            meta.apply_defaults(&mut props);
            meta.missing_required(&props)
                .into_iter()
                .map(str::to_string)
                .collect()
        }
        None => Vec::new(),
    };

    ResolvedProps {
        props,
        visible: true,
        disabled,
        diagnostics,
        missing_required,
    }
}

fn is_visible(
    conditions: &Conditions,
    ctx: &RenderContext,
    evaluator: &Evaluator,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let visible = condition(
        conditions.visible.as_ref(),
        conditions.visible_on.as_deref(),
        ConditionKind::VisibleOn,
        ctx,
        evaluator,
        diagnostics,
    );
    visible
        && !condition(
            conditions.hidden.as_ref(),
            conditions.hidden_on.as_deref(),
            ConditionKind::HiddenOn,
            ctx,
            evaluator,
            diagnostics,
        )
}

/// One conditional attribute. An explicit flag defined at the active
/// breakpoint wins over the expression; with neither, the kind's fallback
/// applies.
fn condition(
    flag: Option<&Flag>,
    expression: Option<&str>,
    kind: ConditionKind,
    ctx: &RenderContext,
    evaluator: &Evaluator,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    if let Some(value) = flag.and_then(|f| f.at(ctx.breakpoint())) {
        return value;
    }
    let Some(source) = expression else {
        return kind.fallback();
    };
    let outcome = evaluator.condition(kind, source, ctx.expr());
    if let Some(error) = outcome.error {
        if evaluator.mode() == ExpressionMode::Strict {
            diagnostics.push(Diagnostic::new(kind.attribute(), error.to_string()));
        }
    }
    outcome.value
}

/// Resolves `${…}` templates in string props. A prop whose template fails is
/// dropped so component defaults apply in its place.
fn interpolate_props(
    props: &mut Map<String, Value>,
    ctx: &RenderContext,
    evaluator: &Evaluator,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut failed = Vec::new();
    for (name, value) in props.iter_mut() {
        let Value::String(text) = value else {
            continue;
        };
        if !Evaluator::is_template(text) {
            continue;
        }
        match evaluator.resolve_template(text, ctx.expr()) {
            Ok(resolved) => *value = resolved,
            Err(error) => {
                report_template_failure(name, &error, evaluator, diagnostics);
                failed.push(name.clone());
            }
        }
    }
    for name in failed {
        props.remove(&name);
    }
}

/// Resolves the display text of leaf content. Failed templates render empty.
pub(crate) fn leaf_text(
    text: String,
    ctx: &RenderContext,
    evaluator: &Evaluator,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    if !Evaluator::is_template(&text) {
        return text;
    }
    evaluator.interpolate(&text, ctx.expr()).unwrap_or_else(|error| {
        report_template_failure("body", &error, evaluator, diagnostics);
        String::new()
    })
}

fn report_template_failure(
    attribute: &str,
    error: &ExprError,
    evaluator: &Evaluator,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match evaluator.mode() {
        ExpressionMode::Lenient => {
            debug!(attribute, error = %error, "Template failed, attribute dropped");
        }
        ExpressionMode::Strict => {
            warn!(attribute, error = %error, "Template failed, attribute dropped");
            diagnostics.push(Diagnostic::new(attribute, error.to_string()));
        }
    }
}
