//! Query evaluation over in-memory records: filter, search, sort, paging,
//! projection.

use crate::error::{DataError, DataResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use trellis_schema::{
    compare_values, lookup_field, Filter, FilterOp, QueryParams, QueryResult, SortField, SortOrder,
};

/// Rejects parameters an adapter cannot evaluate.
pub fn validate(params: &QueryParams) -> DataResult<()> {
    if let Some(filter) = &params.filter {
        validate_filter(filter)?;
    }
    if let Some(sort) = params.order_by.iter().find(|s| s.field.trim().is_empty()) {
        return Err(DataError::InvalidQuery(format!(
            "empty $orderby field (order {:?})",
            sort.order
        )));
    }
    Ok(())
}

fn validate_filter(filter: &Filter) -> DataResult<()> {
    match filter {
        Filter::Compare { field, op, value } => {
            if field.trim().is_empty() {
                return Err(DataError::InvalidQuery("filter on empty field name".into()));
            }
            match (op, value) {
                (FilterOp::In | FilterOp::NotIn, Value::Array(_)) => Ok(()),
                (FilterOp::In | FilterOp::NotIn, other) => Err(DataError::InvalidQuery(format!(
                    "`{op}` on `{field}` expects an array, got {other}"
                ))),
                (FilterOp::Between, Value::Array(bounds)) if bounds.len() == 2 => Ok(()),
                (FilterOp::Between, other) => Err(DataError::InvalidQuery(format!(
                    "`between` on `{field}` expects [low, high], got {other}"
                ))),
                _ => Ok(()),
            }
        }
        Filter::And(items) | Filter::Or(items) => items.iter().try_for_each(validate_filter),
        Filter::Not(inner) => validate_filter(inner),
    }
}

/// Case-insensitive substring match over the record's string fields.
pub fn matches_search(record: &Value, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    match record {
        Value::Object(fields) => fields
            .values()
            .filter_map(Value::as_str)
            .any(|text| text.to_lowercase().contains(&needle)),
        Value::String(text) => text.to_lowercase().contains(&needle),
        _ => false,
    }
}

/// Compares two records on a single sort key. Missing and `null` values sort
/// first; values of different kinds compare equal so the sort stays stable.
fn compare_on(a: &Value, b: &Value, sort: &SortField) -> Ordering {
    let left = lookup_field(a, &sort.field).filter(|v| !v.is_null());
    let right = lookup_field(b, &sort.field).filter(|v| !v.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y).unwrap_or(Ordering::Equal);
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}

/// Stable multi-key sort.
pub fn sort_records(records: &mut [Value], order_by: &[SortField]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        order_by
            .iter()
            .map(|sort| compare_on(a, b, sort))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Keeps the selected top-level fields plus `id`.
pub fn project(record: Value, select: &[String]) -> Value {
    if select.is_empty() {
        return record;
    }
    let Value::Object(mut fields) = record else {
        return record;
    };
    let mut kept = Map::new();
    if let Some(id) = fields.remove("id") {
        kept.insert("id".to_string(), id);
    }
    for name in select {
        if let Some(value) = fields.remove(name.as_str()) {
            kept.insert(name.clone(), value);
        }
    }
    Value::Object(kept)
}

/// Filters, searches, sorts and pages `records`. Projection and expansion
/// are left to the caller so expanded relations can still be selected.
pub fn execute<'a>(
    records: impl IntoIterator<Item = &'a Value>,
    params: &QueryParams,
) -> DataResult<QueryResult> {
    validate(params)?;

    let mut matched: Vec<Value> = records
        .into_iter()
        .filter(|record| params.filter.as_ref().is_none_or(|f| f.matches(record)))
        .filter(|record| {
            params
                .search
                .as_deref()
                .map(str::trim)
                .is_none_or(|needle| needle.is_empty() || matches_search(record, needle))
        })
        .cloned()
        .collect();
    sort_records(&mut matched, &params.order_by);

    let total = matched.len() as u64;
    let skip = params.skip.unwrap_or(0);
    let paginated = params.skip.is_some() || params.top.is_some();

    let data: Vec<Value> = matched
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(params.top.map_or(usize::MAX, |top| usize::try_from(top).unwrap_or(usize::MAX)))
        .collect();

    let mut result = QueryResult::from_records(data);
    if params.count {
        result.total = Some(total);
    }
    if let Some(top) = params.top {
        result.page = skip.checked_div(top).map(|page| page + 1);
        result.page_size = Some(top);
    }
    if paginated {
        result.has_more = Some(skip + (result.data.len() as u64) < total);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nulls_sort_first_in_both_directions() {
        let mut records = vec![json!({"n": 2}), json!({"n": null}), json!({"n": 1}), json!({})];
        sort_records(&mut records, &[SortField::desc("n")]);
        assert_eq!(records, vec![json!({"n": null}), json!({}), json!({"n": 2}), json!({"n": 1})]);
    }

    #[test]
    fn projection_keeps_id() {
        let record = json!({"id": 1, "name": "a", "secret": "x"});
        assert_eq!(project(record, &["name".into()]), json!({"id": 1, "name": "a"}));
    }

    #[test]
    fn search_ignores_case_and_non_strings() {
        let record = json!({"name": "Widget", "qty": 5});
        assert!(matches_search(&record, "widg"));
        assert!(!matches_search(&record, "5"));
    }
}
