use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Result slot of a read-model query.
///
/// An empty response means "no handler produced a result" (unknown query type,
/// or no data matched); it is never an error by itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    value: Option<JsonValue>,
}

impl QueryResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(value: JsonValue) -> Self {
        Self { value: Some(value) }
    }

    pub fn value(&self) -> Option<&JsonValue> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<JsonValue> {
        self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_filled() {
        assert!(QueryResponse::empty().is_empty());
        let response = QueryResponse::of(json!({"label": "X"}));
        assert!(!response.is_empty());
        assert_eq!(response.value().unwrap()["label"], "X");
        assert_eq!(response.into_value(), Some(json!({"label": "X"})));
    }
}
