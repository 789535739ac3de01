use crate::query::QueryParams;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A node's request for backend data.
///
/// With `id` the pipeline fetches a single record; without it, a collection.
/// `resource` and `id` may contain `${…}` templates resolved against the
/// node's context before the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBinding {
    pub resource: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "QueryParams::is_empty")]
    pub params: QueryParams,
}

impl DataBinding {
    /// Binding to a collection query.
    pub fn find(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: None,
            params: QueryParams::default(),
        }
    }

    /// Binding to a single record.
    pub fn find_one(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: Some(id.into()),
            params: QueryParams::default(),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Returns whether this binding targets one record.
    pub fn is_single(&self) -> bool {
        self.id.is_some()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
