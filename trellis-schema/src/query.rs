//! Query request/response types exchanged with data sources.

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ---- Sorting ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One entry of `$orderby`.
///
/// Accepts `{"field": "name", "order": "desc"}` or the short form `"name desc"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SortFieldRepr")]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortFieldRepr {
    Short(String),
    Full {
        field: String,
        #[serde(default)]
        order: SortOrder,
    },
}

impl TryFrom<SortFieldRepr> for SortField {
    type Error = String;

    fn try_from(repr: SortFieldRepr) -> Result<Self, Self::Error> {
        match repr {
            SortFieldRepr::Full { field, order } => Ok(Self { field, order }),
            SortFieldRepr::Short(text) => {
                let mut parts = text.split_whitespace();
                let field = parts
                    .next()
                    .ok_or_else(|| "empty $orderby entry".to_string())?;
                let order = match parts.next().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("asc") => SortOrder::Asc,
                    Some("desc") => SortOrder::Desc,
                    Some(other) => return Err(format!("unknown sort direction `{other}`")),
                };
                Ok(Self {
                    field: field.to_string(),
                    order,
                })
            }
        }
    }
}

// ---- Filters ----

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Between,
}

impl FilterOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Between => "between",
        }
    }

    /// Applies the operator to a record's field value (`None` when absent).
    pub fn test(&self, actual: Option<&Value>, expected: &Value) -> bool {
        let actual = actual.unwrap_or(&Value::Null);
        match self {
            Self::Eq => values_equal(actual, expected),
            Self::Ne => !values_equal(actual, expected),
            Self::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
            Self::Ge => matches!(
                compare_values(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => compare_values(actual, expected) == Some(Ordering::Less),
            Self::Le => matches!(
                compare_values(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In => expected
                .as_array()
                .is_some_and(|list| list.iter().any(|v| values_equal(actual, v))),
            Self::NotIn => !Self::In.test(Some(actual), expected),
            Self::Contains => match actual {
                Value::String(haystack) => expected
                    .as_str()
                    .is_some_and(|needle| haystack.to_lowercase().contains(&needle.to_lowercase())),
                Value::Array(items) => items.iter().any(|v| values_equal(v, expected)),
                _ => false,
            },
            Self::StartsWith => string_pair(actual, expected)
                .is_some_and(|(a, e)| a.to_lowercase().starts_with(&e.to_lowercase())),
            Self::EndsWith => string_pair(actual, expected)
                .is_some_and(|(a, e)| a.to_lowercase().ends_with(&e.to_lowercase())),
            Self::Between => match expected.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    Self::Ge.test(Some(actual), low) && Self::Le.test(Some(actual), high)
                }
                _ => false,
            },
        }
    }
}

fn string_pair<'a>(a: &'a Value, b: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((a.as_str()?, b.as_str()?))
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Self::Eq,
            "!=" | "<>" | "ne" => Self::Ne,
            ">" | "gt" => Self::Gt,
            ">=" | "gte" | "ge" => Self::Ge,
            "<" | "lt" => Self::Lt,
            "<=" | "lte" | "le" => Self::Le,
            "in" => Self::In,
            "notin" | "not in" | "nin" => Self::NotIn,
            "contains" | "like" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "between" => Self::Between,
            _ => return Err(SchemaError::InvalidFilter(format!("unknown operator `{s}`"))),
        };
        Ok(op)
    }
}

/// Structured `$filter` predicate.
///
/// Wire form is a JSON array: `["field", "op", value]` for a comparison,
/// `["not", pred]` for negation, and `[pred, "and", pred, "or", pred]` for
/// chains, where `and` binds tighter than `or`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: String,
        op: FilterOp,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Shorthand for a comparison leaf.
    pub fn compare(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, FilterOp::Eq, value)
    }

    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let Value::Array(items) = value else {
            return Err(SchemaError::InvalidFilter(format!(
                "expected array, got {value}"
            )));
        };
        match items.as_slice() {
            [] => Ok(Self::And(Vec::new())),
            [Value::String(head), inner] if head.eq_ignore_ascii_case("not") => {
                Ok(Self::Not(Box::new(Self::from_value(inner)?)))
            }
            [Value::String(field), Value::String(op), value] => Ok(Self::Compare {
                field: field.clone(),
                op: op.parse()?,
                value: value.clone(),
            }),
            _ => Self::parse_chain(items),
        }
    }

    fn parse_chain(items: &[Value]) -> SchemaResult<Self> {
        let mut groups: Vec<Vec<Filter>> = Vec::new();
        let mut current: Vec<Filter> = Vec::new();
        let mut expect_predicate = true;

        for item in items {
            if expect_predicate {
                current.push(Self::from_value(item)?);
            } else {
                match item.as_str().map(str::to_ascii_lowercase).as_deref() {
                    Some("and") => {}
                    Some("or") => groups.push(std::mem::take(&mut current)),
                    _ => {
                        return Err(SchemaError::InvalidFilter(format!(
                            "expected `and`/`or`, got {item}"
                        )));
                    }
                }
            }
            expect_predicate = !expect_predicate;
        }
        if expect_predicate {
            return Err(SchemaError::InvalidFilter(
                "filter ends with a connector".to_string(),
            ));
        }
        groups.push(current);

        let mut alternatives: Vec<Filter> = groups
            .into_iter()
            .map(|mut group| {
                if group.len() == 1 {
                    group.remove(0)
                } else {
                    Self::And(group)
                }
            })
            .collect();
        Ok(if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Self::Or(alternatives)
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Compare { field, op, value } => json!([field, op.as_str(), value]),
            Self::Not(inner) => json!(["not", inner.to_value()]),
            Self::And(items) => join_chain(items, "and"),
            Self::Or(items) => join_chain(items, "or"),
        }
    }

    /// Evaluates the predicate against a record.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Self::Compare { field, op, value } => op.test(lookup_field(record, field), value),
            Self::And(items) => items.iter().all(|f| f.matches(record)),
            Self::Or(items) => items.iter().any(|f| f.matches(record)),
            Self::Not(inner) => !inner.matches(record),
        }
    }
}

fn join_chain(items: &[Filter], connector: &str) -> Value {
    let mut out = Vec::with_capacity(items.len() * 2);
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(Value::String(connector.to_string()));
        }
        out.push(item.to_value());
    }
    Value::Array(out)
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

// ---- Value helpers ----

/// Looks up a dotted path (`customer.name`, `lines.0.sku`) in a record.
pub fn lookup_field<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Equality with numeric normalization (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two scalar values of the same kind; `None` for mixed or composite kinds.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// ---- Params / Result ----

/// Query parameters of a collection read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Projection. Empty means all fields.
    #[serde(rename = "$select", default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(rename = "$filter", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(rename = "$orderby", default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<SortField>,
    #[serde(rename = "$skip", default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(rename = "$top", default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u64>,
    /// Related resources to inline.
    #[serde(rename = "$expand", default, skip_serializing_if = "Vec::is_empty")]
    pub expand: Vec<String>,
    #[serde(rename = "$search", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Request `total` in the result.
    #[serde(rename = "$count", default, skip_serializing_if = "is_false")]
    pub count: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, sort: SortField) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn expand(mut self, relation: impl Into<String>) -> Self {
        self.expand.push(relation.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Result of a collection read.
///
/// `has_more` is authoritative when set. Callers must not infer end-of-data
/// from `data.len() < $top` when the source leaves it unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl QueryResult {
    /// An empty result: no matches is not an error.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(data: Vec<Value>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `Some(true)` when the source says no further pages exist, `None` when
    /// the source did not say.
    pub fn end_of_data(&self) -> Option<bool> {
        self.has_more.map(|more| !more)
    }
}
