//! Read-only entity hierarchy returned by the repository

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested tree of entity attributes, keyed first by the root entity type
///
/// Related entities sit under their type name: one-to-many relations as
/// arrays, one-to-one relations as objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHierarchy(Value);

impl EntityHierarchy {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Hierarchy whose single top-level key is the root type
    pub fn rooted(root_type: &str, root: Map<String, Value>) -> Self {
        let mut top = Map::new();
        top.insert(root_type.to_string(), Value::Object(root));
        Self(Value::Object(top))
    }

    /// Resolve a path of keys, treating missing and null segments alike
    pub fn value_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        value_at(&self.0, path)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Walk `path` through nested objects; `None` once a segment is absent or null
pub fn value_at<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        match current.get(segment.as_ref()) {
            Some(Value::Null) | None => return None,
            Some(next) => current = next,
        }
    }
    Some(current)
}
