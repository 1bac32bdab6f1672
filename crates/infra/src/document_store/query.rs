//! Query predicates understood by every document store backend.
//!
//! Paths are JSON pointers (`/name`, `/type/providers`) into the stored
//! document. Backends translate predicates into their native query language;
//! the in-memory store evaluates them directly with [`Predicate::matches`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default number of documents fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Every document in the partition.
    All,
    /// Value at `path` equals `value` (exact, case-sensitive for strings).
    FieldEquals { path: String, value: JsonValue },
    /// Value at `path` equals one of `values`.
    FieldIn { path: String, values: Vec<JsonValue> },
    /// `collection` is an array with at least one element whose `field`
    /// equals `value` (structural existence test).
    AnyElementEquals {
        collection: String,
        field: String,
        value: JsonValue,
    },
    /// At least one of the nested predicates holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn field_equals(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::FieldEquals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn field_in<I, V>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::FieldIn {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any_element_equals(
        collection: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self::AnyElementEquals {
            collection: collection.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    pub fn matches(&self, document: &JsonValue) -> bool {
        match self {
            Predicate::All => true,
            Predicate::FieldEquals { path, value } => document.pointer(path) == Some(value),
            Predicate::FieldIn { path, values } => document
                .pointer(path)
                .is_some_and(|found| values.contains(found)),
            Predicate::AnyElementEquals {
                collection,
                field,
                value,
            } => document
                .pointer(collection)
                .and_then(JsonValue::as_array)
                .is_some_and(|items| items.iter().any(|item| item.pointer(field) == Some(value))),
            Predicate::Or(predicates) => predicates.iter().any(|p| p.matches(document)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> JsonValue {
        json!({
            "id": "p1",
            "name": "Apollo",
            "type": { "providers": [ { "id": "azure.devops" }, { "id": "github" } ] }
        })
    }

    #[test]
    fn field_equals_is_case_sensitive() {
        assert!(Predicate::field_equals("/name", "Apollo").matches(&doc()));
        assert!(!Predicate::field_equals("/name", "apollo").matches(&doc()));
        assert!(!Predicate::field_equals("/missing", "Apollo").matches(&doc()));
    }

    #[test]
    fn id_or_name_membership() {
        let by_name = Predicate::or([
            Predicate::field_in("/id", ["Apollo", "x"]),
            Predicate::field_in("/name", ["Apollo", "x"]),
        ]);
        assert!(by_name.matches(&doc()));

        let neither = Predicate::or([
            Predicate::field_in("/id", ["y"]),
            Predicate::field_in("/name", ["y"]),
        ]);
        assert!(!neither.matches(&doc()));
    }

    #[test]
    fn nested_collection_existence() {
        assert!(Predicate::any_element_equals("/type/providers", "/id", "github").matches(&doc()));
        assert!(!Predicate::any_element_equals("/type/providers", "/id", "gitlab").matches(&doc()));
        // Not an array: never matches.
        assert!(!Predicate::any_element_equals("/name", "/id", "Apollo").matches(&doc()));
    }
}
