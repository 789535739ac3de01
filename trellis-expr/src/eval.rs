//! Tree-walking interpreter.

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::context::ExprContext;
use crate::error::{ExprError, ExprResult};
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;
use trellis_schema::{compare_values, values_equal};

/// JavaScript-style truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form used by string concatenation and template interpolation.
/// `null` renders as the empty string; composites render as JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Converts a computed float back into a JSON number, keeping integers integral.
pub(crate) fn number_value(n: f64) -> ExprResult<Value> {
    if !n.is_finite() {
        return Err(ExprError::type_error("arithmetic produced a non-finite number"));
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| ExprError::type_error("arithmetic produced a non-finite number"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_number(value: &Value, op: &str) -> ExprResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ExprError::type_error(format!("`{op}` expects numbers, got {}", kind(value))))
}

/// Evaluates `expr`, borrowing from `ctx` wherever possible.
pub(crate) fn eval<'a>(expr: &Expr, ctx: &'a ExprContext) -> ExprResult<Cow<'a, Value>> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Owned(value.clone())),
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, ctx).map(Cow::into_owned))
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(Cow::Owned(Value::Array(values)))
        }
        Expr::Ident(name) => ctx
            .lookup(name)
            .ok_or_else(|| ExprError::UndefinedVariable(name.clone())),
        Expr::Member { object, property } => {
            let target = eval(object, ctx)?;
            member(target, property)
        }
        Expr::Index { object, index } => {
            let target = eval(object, ctx)?;
            let key = eval(index, ctx)?;
            match key.as_ref() {
                Value::String(name) => member(target, name),
                Value::Number(n) => match n.as_u64() {
                    Some(i) => member(target, &i.to_string()),
                    None => Ok(Cow::Owned(Value::Null)),
                },
                other => Err(ExprError::type_error(format!(
                    "cannot index with {}",
                    kind(other)
                ))),
            }
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Cow::Owned(Value::Bool(!is_truthy(&value)))),
                UnaryOp::Neg => number_value(-as_number(&value, "-")?).map(Cow::Owned),
            }
        }
        Expr::Logical { op, left, right } => {
            let lhs = eval(left, ctx)?;
            match (op, is_truthy(&lhs)) {
                (LogicalOp::And, true) | (LogicalOp::Or, false) => eval(right, ctx),
                _ => Ok(lhs),
            }
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            binary(*op, &lhs, &rhs).map(Cow::Owned)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if is_truthy(eval(test, ctx)?.as_ref()) {
                eval(consequent, ctx)
            } else {
                eval(alternate, ctx)
            }
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<ExprResult<Vec<_>>>()?;
            call(function, &values).map(Cow::Owned)
        }
    }
}

fn member<'a>(target: Cow<'a, Value>, property: &str) -> ExprResult<Cow<'a, Value>> {
    match target {
        Cow::Borrowed(value) => member_ref(value, property),
        Cow::Owned(value) => member_ref(&value, property).map(|v| Cow::Owned(v.into_owned())),
    }
}

fn member_ref<'a>(target: &'a Value, property: &str) -> ExprResult<Cow<'a, Value>> {
    match target {
        Value::Object(fields) => Ok(fields
            .get(property)
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(Value::Null))),
        Value::Array(items) if property == "length" => Ok(Cow::Owned(Value::from(items.len()))),
        Value::Array(items) => Ok(property
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(Value::Null))),
        Value::String(s) if property == "length" => {
            Ok(Cow::Owned(Value::from(s.chars().count())))
        }
        other => Err(ExprError::type_error(format!(
            "cannot read property `{property}` of {}",
            kind(other)
        ))),
    }
}

fn binary(op: BinaryOp, a: &Value, b: &Value) -> ExprResult<Value> {
    let value = match op {
        BinaryOp::Eq => Value::Bool(values_equal(a, b)),
        BinaryOp::Ne => Value::Bool(!values_equal(a, b)),
        BinaryOp::Lt => Value::Bool(compare_values(a, b) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare_values(a, b),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare_values(a, b) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare_values(a, b),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Add if a.is_string() || b.is_string() => {
            Value::String(display_string(a) + &display_string(b))
        }
        BinaryOp::Add => number_value(as_number(a, "+")? + as_number(b, "+")?)?,
        BinaryOp::Sub => number_value(as_number(a, "-")? - as_number(b, "-")?)?,
        BinaryOp::Mul => number_value(as_number(a, "*")? * as_number(b, "*")?)?,
        BinaryOp::Div | BinaryOp::Mod => {
            let symbol = if op == BinaryOp::Div { "/" } else { "%" };
            let (x, y) = (as_number(a, symbol)?, as_number(b, symbol)?);
            if y == 0.0 {
                return Err(ExprError::type_error("division by zero"));
            }
            number_value(if op == BinaryOp::Div { x / y } else { x % y })?
        }
    };
    Ok(value)
}

fn arity(function: &str, args: &[Cow<'_, Value>], expected: usize) -> ExprResult<()> {
    if args.len() != expected {
        return Err(ExprError::type_error(format!(
            "`{function}` expects {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn string_arg<'v>(function: &str, value: &'v Value) -> ExprResult<&'v str> {
    value.as_str().ok_or_else(|| {
        ExprError::type_error(format!("`{function}` expects a string, got {}", kind(value)))
    })
}

fn call(function: &str, args: &[Cow<'_, Value>]) -> ExprResult<Value> {
    match function {
        "len" => {
            arity(function, args, 1)?;
            let len = match args[0].as_ref() {
                Value::Null => 0,
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(fields) => fields.len(),
                other => {
                    return Err(ExprError::type_error(format!(
                        "`len` not defined for {}",
                        kind(other)
                    )));
                }
            };
            Ok(Value::from(len))
        }
        "includes" | "contains" => {
            arity(function, args, 2)?;
            let needle = args[1].as_ref();
            let found = match args[0].as_ref() {
                Value::Null => false,
                Value::String(s) => s.contains(&display_string(needle)),
                Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
                Value::Object(fields) => needle.as_str().is_some_and(|k| fields.contains_key(k)),
                other => {
                    return Err(ExprError::type_error(format!(
                        "`{function}` not defined for {}",
                        kind(other)
                    )));
                }
            };
            Ok(Value::Bool(found))
        }
        "startsWith" | "endsWith" => {
            arity(function, args, 2)?;
            let subject = string_arg(function, &args[0])?;
            let affix = string_arg(function, &args[1])?;
            Ok(Value::Bool(if function == "startsWith" {
                subject.starts_with(affix)
            } else {
                subject.ends_with(affix)
            }))
        }
        "lower" | "upper" => {
            arity(function, args, 1)?;
            if args[0].is_null() {
                return Ok(Value::String(String::new()));
            }
            let subject = string_arg(function, &args[0])?;
            Ok(Value::String(if function == "lower" {
                subject.to_lowercase()
            } else {
                subject.to_uppercase()
            }))
        }
        "isEmpty" => {
            arity(function, args, 1)?;
            let empty = match args[0].as_ref() {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(items) => items.is_empty(),
                Value::Object(fields) => fields.is_empty(),
                _ => false,
            };
            Ok(Value::Bool(empty))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}
