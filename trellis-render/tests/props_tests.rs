use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use trellis_expr::{Evaluator, ExpressionMode};
use trellis_registry::{BuiltinComponents, ComponentRegistry};
use trellis_render::{resolve_props, RenderContext, RenderPipeline};
use trellis_schema::{Breakpoint, SchemaNode};
use std::sync::Arc;

fn pipeline() -> RenderPipeline {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    RenderPipeline::builder(Arc::new(registry)).build()
}

fn node(value: Value) -> SchemaNode {
    SchemaNode::from_value(value).unwrap()
}

// ── resolve_props ──

#[test]
fn applies_component_defaults_under_explicit_props() {
    let resolved = pipeline().resolve_props(
        &node(json!({ "type": "button", "label": "Save", "level": "primary" })),
        &RenderContext::new(Breakpoint::Md),
    );
    let mut expected = Map::new();
    expected.insert("label".into(), json!("Save"));
    expected.insert("level".into(), json!("primary"));
    assert_eq!(resolved.props, expected);
    assert!(resolved.visible);
    assert!(!resolved.disabled);
}

#[test]
fn reports_missing_required_inputs() {
    let resolved = pipeline().resolve_props(
        &node(json!({ "type": "input", "label": "Name" })),
        &RenderContext::new(Breakpoint::Md),
    );
    assert_eq!(resolved.missing_required, vec!["name".to_string()]);
    assert_eq!(resolved.props["inputType"], json!("text"));
}

#[test]
fn conditions_never_leak_into_props() {
    let resolved = pipeline().resolve_props(
        &node(json!({ "type": "divider", "visibleOn": "true", "disabled": false })),
        &RenderContext::new(Breakpoint::Md),
    );
    assert!(resolved.props.is_empty());
}

#[test]
fn hidden_nodes_resolve_no_props() {
    let resolved = pipeline().resolve_props(
        &node(json!({ "type": "grid", "columns": 2, "hiddenOn": "record.archived" })),
        &RenderContext::new(Breakpoint::Md).with_record(json!({ "archived": true })),
    );
    assert!(!resolved.visible);
    assert!(resolved.props.is_empty());
}

#[test]
fn unregistered_types_get_no_defaults() {
    let evaluator = Evaluator::new();
    let resolved = resolve_props(
        &node(json!({ "type": "chart", "series": { "sm": "a", "xl": "b" } })),
        &RenderContext::new(Breakpoint::Lg),
        &evaluator,
        None,
    );
    assert_eq!(resolved.props.get("series"), Some(&json!("a")));
    assert!(resolved.missing_required.is_empty());
}

#[test]
fn serializes_for_config_editors() {
    let resolved = pipeline().resolve_props(
        &node(json!({ "type": "tpl" })),
        &RenderContext::new(Breakpoint::Md),
    );
    let value = serde_json::to_value(&resolved).unwrap();
    assert_eq!(value["missingRequired"], json!(["tpl"]));
    assert_eq!(value["visible"], json!(true));
}

#[test]
fn strict_mode_records_template_diagnostics() {
    let evaluator = Evaluator::new().with_mode(ExpressionMode::Strict);
    let resolved = resolve_props(
        &node(json!({ "type": "text", "value": "${user.name.first}" })),
        &RenderContext::new(Breakpoint::Md),
        &evaluator,
        None,
    );
    assert!(resolved.props.get("value").is_none());
    assert_eq!(resolved.diagnostics.len(), 1);
    assert_eq!(resolved.diagnostics[0].attribute, "value");
}

// ── Properties ──

fn broken_expression() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("1 +".to_string()),
        Just("missing".to_string()),
        Just("user.name.first".to_string()),
        Just("(a".to_string()),
        Just("1 / 0".to_string()),
        "[a-z]{1,8}\\.[a-z]{1,8}".prop_map(|s| format!("nope_{s}")),
    ]
}

proptest! {
    #[test]
    fn broken_conditions_fail_open(expr in broken_expression(), strict in any::<bool>()) {
        let mode = if strict { ExpressionMode::Strict } else { ExpressionMode::Lenient };
        let evaluator = Evaluator::new().with_mode(mode);
        let ctx = RenderContext::new(Breakpoint::Md);
        for attribute in ["visibleOn", "hiddenOn", "disabledOn"] {
            let mut doc = json!({ "type": "divider" });
            doc[attribute] = json!(expr.clone());
            let resolved = resolve_props(&node(doc), &ctx, &evaluator, None);
            prop_assert!(resolved.visible);
            prop_assert!(!resolved.disabled);
            prop_assert_eq!(resolved.diagnostics.len(), usize::from(strict));
        }
    }

    #[test]
    fn explicit_hidden_always_wins(expr in "(true|false|1 == 1|user\\.x)") {
        let evaluator = Evaluator::new();
        let doc = json!({ "type": "divider", "hidden": true, "visibleOn": expr });
        let resolved = resolve_props(&node(doc), &RenderContext::new(Breakpoint::Md), &evaluator, None);
        prop_assert!(!resolved.visible);
    }

    #[test]
    fn cascade_holds_between_defined_breakpoints(
        defined in proptest::collection::btree_set(0usize..6, 1..6),
        values in proptest::collection::vec(1u64..12, 6),
        a in 0usize..6,
        b in 0usize..6,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assume!(!defined.iter().any(|i| *i > low && *i <= high));

        let mut columns = Map::new();
        for i in &defined {
            columns.insert(Breakpoint::ALL[*i].name().to_string(), json!(values[*i]));
        }
        let doc = json!({ "type": "chart", "columns": Value::Object(columns) });
        let evaluator = Evaluator::new();
        let at = |i: usize| {
            resolve_props(&node(doc.clone()), &RenderContext::new(Breakpoint::ALL[i]), &evaluator, None)
                .props
                .get("columns")
                .cloned()
        };
        prop_assert_eq!(at(low), at(high));
    }
}
