//! Responsive value resolution.
//!
//! A responsive value is a JSON object whose keys are all breakpoint names,
//! e.g. `{"xs": 1, "lg": 3}`. Resolution is a mobile-first cascade: the value
//! defined at the greatest breakpoint not larger than the active one wins.
//! When nothing is defined at or below the active breakpoint the result is
//! `None`, meaning "no override at this size".

use crate::Breakpoint;
use serde_json::{Map, Value};

/// Returns whether `value` is a breakpoint-keyed object.
///
/// Empty objects and objects with any non-breakpoint key are plain values.
pub fn is_responsive(value: &Value) -> bool {
    match value {
        Value::Object(map) => is_responsive_map(map),
        _ => false,
    }
}

pub(crate) fn is_responsive_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| Breakpoint::is_breakpoint_key(k))
}

/// Resolves `value` for `active`, borrowing from the input.
///
/// Plain values pass through unchanged.
pub fn resolve_ref(value: &Value, active: Breakpoint) -> Option<&Value> {
    match value {
        Value::Object(map) if is_responsive_map(map) => resolve_map(map, active),
        other => Some(other),
    }
}

/// Resolves `value` for `active`.
pub fn resolve(value: &Value, active: Breakpoint) -> Option<Value> {
    resolve_ref(value, active).cloned()
}

/// Cascade lookup over a breakpoint-keyed map.
pub(crate) fn resolve_map(map: &Map<String, Value>, active: Breakpoint) -> Option<&Value> {
    Breakpoint::ALL
        .iter()
        .rev()
        .filter(|bp| **bp <= active)
        .find_map(|bp| map.get(bp.name()))
}

/// Resolves every attribute of `attributes` for `active`.
///
/// Attributes with no value at this size are dropped. Resolution is shallow:
/// objects nested inside a plain attribute are left as-is.
pub fn resolve_attributes(attributes: &Map<String, Value>, active: Breakpoint) -> Map<String, Value> {
    attributes
        .iter()
        .filter_map(|(key, value)| resolve(value, active).map(|v| (key.clone(), v)))
        .collect()
}
