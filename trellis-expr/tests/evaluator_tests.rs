use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use trellis_expr::{ConditionKind, Evaluator, ExprContext, ExprError, ExpressionMode};
use trellis_schema::Breakpoint;

fn ctx() -> ExprContext {
    ExprContext::new(Breakpoint::Md)
        .with_data(json!({
            "status": "open",
            "count": 3,
            "tags": ["a", "b"],
            "owner": { "name": "Ada" },
        }))
        .with_record(json!({ "id": 7, "total": 12.5 }))
        .with_user(json!({ "role": "admin" }))
        .with_var("threshold", json!(2))
}

const KINDS: [ConditionKind; 3] = [
    ConditionKind::VisibleOn,
    ConditionKind::HiddenOn,
    ConditionKind::DisabledOn,
];

// ── Scope ────────────────────────────────────────────────────────

#[test]
fn data_fields_resolve_as_bare_identifiers() {
    let ev = Evaluator::new();
    assert!(ev.evaluate("status == 'open' && count > 2", &ctx()).unwrap());
    assert_eq!(ev.eval_value("data.owner.name", &ctx()).unwrap(), json!("Ada"));
}

#[test]
fn reserved_roots_resolve() {
    let ev = Evaluator::new();
    assert!(ev.evaluate("user.role === 'admin'", &ctx()).unwrap());
    assert!(ev.evaluate("breakpoint == 'md'", &ctx()).unwrap());
    assert_eq!(ev.eval_value("record.id", &ctx()).unwrap(), json!(7));
}

#[test]
fn vars_shadow_data_fields() {
    let ev = Evaluator::new();
    let scope = ctx().with_var("status", json!("closed"));
    assert_eq!(ev.eval_value("status", &scope).unwrap(), json!("closed"));
    assert!(ev.evaluate("count > threshold", &scope).unwrap());
    assert_eq!(ev.eval_value("vars.threshold", &scope).unwrap(), json!(2));
}

#[test]
fn unknown_root_is_undefined() {
    let ev = Evaluator::new();
    assert_eq!(
        ev.evaluate("nope", &ctx()).unwrap_err(),
        ExprError::UndefinedVariable("nope".into())
    );
}

#[test]
fn missing_property_is_null_but_null_member_is_type_error() {
    let ev = Evaluator::new();
    assert_eq!(ev.eval_value("owner.missing", &ctx()).unwrap(), json!(null));
    assert!(matches!(
        ev.eval_value("owner.missing.deeper", &ctx()),
        Err(ExprError::Type(_))
    ));
}

// ── Operators ────────────────────────────────────────────────────

#[test]
fn arithmetic_keeps_integers_integral() {
    let ev = Evaluator::new();
    assert_eq!(ev.eval_value("record.id + 1", &ctx()).unwrap(), json!(8));
    assert_eq!(ev.eval_value("10 / 4", &ctx()).unwrap(), json!(2.5));
    assert_eq!(ev.eval_value("7 % 4", &ctx()).unwrap(), json!(3));
    assert_eq!(ev.eval_value("-count", &ctx()).unwrap(), json!(-3));
}

#[test]
fn division_by_zero_is_a_type_error() {
    let ev = Evaluator::new();
    assert!(matches!(ev.eval_value("1 / 0", &ctx()), Err(ExprError::Type(_))));
}

#[test]
fn plus_concatenates_when_either_side_is_a_string() {
    let ev = Evaluator::new();
    assert_eq!(ev.eval_value("'n=' + count", &ctx()).unwrap(), json!("n=3"));
    assert_eq!(ev.eval_value("count + ''", &ctx()).unwrap(), json!("3"));
}

#[test]
fn numeric_equality_ignores_representation() {
    let ev = Evaluator::new();
    assert!(ev.evaluate("1 == 1.0", &ctx()).unwrap());
    assert!(ev.evaluate("count !== 4", &ctx()).unwrap());
}

#[test]
fn incomparable_values_compare_false() {
    let ev = Evaluator::new();
    assert!(!ev.evaluate("1 < 'a'", &ctx()).unwrap());
    assert!(!ev.evaluate("1 >= 'a'", &ctx()).unwrap());
    assert!(ev.evaluate("'b' > 'a'", &ctx()).unwrap());
}

#[test]
fn logical_operators_short_circuit_and_yield_operands() {
    let ev = Evaluator::new();
    assert_eq!(ev.eval_value("status || 'x'", &ctx()).unwrap(), json!("open"));
    assert_eq!(ev.eval_value("record.none && record.none.x", &ctx()).unwrap(), json!(null));
    assert_eq!(ev.eval_value("record.none || 'fallback'", &ctx()).unwrap(), json!("fallback"));
}

#[test]
fn ternary_selects_branch() {
    let ev = Evaluator::new();
    assert_eq!(
        ev.eval_value("count > 5 ? 'many' : 'few'", &ctx()).unwrap(),
        json!("few")
    );
}

// ── Functions ────────────────────────────────────────────────────

#[test]
fn whitelisted_functions() {
    let ev = Evaluator::new();
    assert_eq!(ev.eval_value("len(tags)", &ctx()).unwrap(), json!(2));
    assert_eq!(ev.eval_value("tags.length", &ctx()).unwrap(), json!(2));
    assert!(ev.evaluate("tags.includes('a')", &ctx()).unwrap());
    assert!(ev.evaluate("contains(status, 'pe')", &ctx()).unwrap());
    assert!(ev.evaluate("status.startsWith('op')", &ctx()).unwrap());
    assert!(ev.evaluate("endsWith(status, 'en')", &ctx()).unwrap());
    assert_eq!(ev.eval_value("upper(owner.name)", &ctx()).unwrap(), json!("ADA"));
    assert_eq!(ev.eval_value("owner.name.lower()", &ctx()).unwrap(), json!("ada"));
    assert!(ev.evaluate("!isEmpty(tags)", &ctx()).unwrap());
    assert!(ev.evaluate("isEmpty(owner.missing)", &ctx()).unwrap());
}

#[test]
fn function_misuse_is_reported() {
    let ev = Evaluator::new();
    assert_eq!(
        ev.evaluate("exec('rm')", &ctx()).unwrap_err(),
        ExprError::UnknownFunction("exec".into())
    );
    assert!(matches!(ev.eval_value("len(5)", &ctx()), Err(ExprError::Type(_))));
    assert!(matches!(ev.eval_value("status.startsWith(1)", &ctx()), Err(ExprError::Type(_))));
    assert!(matches!(ev.eval_value("len()", &ctx()), Err(ExprError::Type(_))));
}

// ── Conditions ───────────────────────────────────────────────────

#[test]
fn wrapped_expression_is_accepted() {
    let ev = Evaluator::new();
    assert!(ev.evaluate("${count == 3}", &ctx()).unwrap());
}

#[test]
fn condition_success_has_no_error() {
    let outcome = Evaluator::new().condition(ConditionKind::HiddenOn, "count > 1", &ctx());
    assert!(outcome.value);
    assert!(!outcome.failed());
}

#[test]
fn failing_conditions_fail_open_per_kind() {
    for mode in [ExpressionMode::Lenient, ExpressionMode::Strict] {
        let ev = Evaluator::new().with_mode(mode);
        let visible = ev.condition(ConditionKind::VisibleOn, "1 +", &ctx());
        let hidden = ev.condition(ConditionKind::HiddenOn, "owner.missing.x", &ctx());
        let disabled = ev.condition(ConditionKind::DisabledOn, "nope", &ctx());
        assert!(visible.value && visible.failed());
        assert!(!hidden.value && hidden.failed());
        assert!(!disabled.value && disabled.failed());
    }
}

#[test]
fn condition_kind_attribute_names() {
    assert_eq!(ConditionKind::VisibleOn.attribute(), "visibleOn");
    assert_eq!(ConditionKind::HiddenOn.attribute(), "hiddenOn");
    assert_eq!(ConditionKind::DisabledOn.attribute(), "disabledOn");
}

#[test]
fn expression_mode_serde_is_lowercase() {
    assert_eq!(serde_json::to_value(ExpressionMode::Strict).unwrap(), json!("strict"));
    let mode: ExpressionMode = serde_json::from_value(json!("lenient")).unwrap();
    assert_eq!(mode, ExpressionMode::Lenient);
    assert_eq!(ExpressionMode::default(), ExpressionMode::Lenient);
}

// ── Templates ────────────────────────────────────────────────────

#[test]
fn interpolate_replaces_each_placeholder() {
    let ev = Evaluator::new();
    assert_eq!(
        ev.interpolate("orders/${record.id}/lines?u=${user.role}", &ctx()).unwrap(),
        "orders/7/lines?u=admin"
    );
    assert_eq!(ev.interpolate("no placeholders", &ctx()).unwrap(), "no placeholders");
}

#[test]
fn interpolate_propagates_errors() {
    let ev = Evaluator::new();
    assert!(ev.interpolate("x/${nope}", &ctx()).is_err());
}

#[test]
fn single_placeholder_template_keeps_type() {
    let ev = Evaluator::new();
    assert_eq!(ev.resolve_template("${record.total}", &ctx()).unwrap(), json!(12.5));
    assert_eq!(ev.resolve_template("Total: ${record.total}", &ctx()).unwrap(), json!("Total: 12.5"));
    assert_eq!(ev.resolve_template("plain", &ctx()).unwrap(), json!("plain"));
    assert!(Evaluator::is_template("a ${b}"));
    assert!(!Evaluator::is_template("a $b"));
}

// ── Cache ────────────────────────────────────────────────────────

#[test]
fn compiled_expressions_are_cached() {
    let ev = Evaluator::new();
    let first = ev.compile("count > 1").unwrap();
    let second = ev.compile("${ count > 1 }").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ev.cached(), 1);
}

#[test]
fn cache_is_bounded() {
    let ev = Evaluator::new().with_cache_capacity(2);
    for source in ["a", "b", "c", "d"] {
        let _ = ev.compile(source);
    }
    assert_eq!(ev.cached(), 2);
}

#[test]
fn zero_capacity_disables_cache() {
    let ev = Evaluator::new().with_cache_capacity(0);
    ev.compile("a").unwrap();
    assert_eq!(ev.cached(), 0);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn any_failure_yields_the_kind_fallback(source in ".{0,40}", kind in 0usize..3) {
        let kind = KINDS[kind];
        let outcome = Evaluator::new().condition(kind, &source, &ctx());
        if outcome.failed() {
            prop_assert_eq!(outcome.value, kind.fallback());
        }
    }

    #[test]
    fn undefined_roots_always_fail_open(name in "zz[a-z]{1,8}", kind in 0usize..3) {
        let kind = KINDS[kind];
        let outcome = Evaluator::new().condition(kind, &format!("{name}.x == 1"), &ctx());
        prop_assert!(outcome.failed());
        prop_assert_eq!(outcome.value, kind != ConditionKind::HiddenOn && kind != ConditionKind::DisabledOn);
    }
}
