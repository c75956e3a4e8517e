//! Common types for the NetBox REST API

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Treat an explicit JSON null like an absent field
pub fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error body returned by NetBox
///
/// Django REST framework answers either `{"detail": "..."}` or a map of
/// field names to messages, e.g. `{"key": ["Token with this Key already exists."]}`.
#[derive(Debug, Default, PartialEq)]
pub struct ApiErrorDetails {
    pub detail: Option<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ApiErrorDetails {
    pub fn from_body(body: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(body).ok()? else {
            return None;
        };

        let mut details = ApiErrorDetails::default();
        for (field, value) in map {
            match (field.as_str(), value) {
                ("detail", Value::String(detail)) => details.detail = Some(detail),
                (_, Value::String(message)) => {
                    details.field_errors.insert(field, vec![message]);
                }
                (_, Value::Array(items)) => {
                    let messages = items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect();
                    details.field_errors.insert(field, messages);
                }
                (_, other) => {
                    details.field_errors.insert(field, vec![other.to_string()]);
                }
            }
        }

        if details.detail.is_none() && details.field_errors.is_empty() {
            return None;
        }
        Some(details)
    }
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![];
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        for (field, messages) in &self.field_errors {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ApiErrorDetails {}
