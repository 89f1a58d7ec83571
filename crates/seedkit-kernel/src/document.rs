//! Backend data documents.
//!
//! A document is a JSON object. Keys whose values are arrays are
//! collections; every other key is opaque metadata that operations carry
//! through untouched. Collection entries that are objects are records; any
//! other entry is a stray entry and is ignored by matching logic.

use crate::error::{DocumentError, json_kind};
use serde_json::{Map, Value};

/// Reserved identity field.
pub const ID_FIELD: &str = "_id";

/// One record: an open, schema-less field map.
pub type Record = Map<String, Value>;

/// A backend data document (collection name → ordered entries).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lift a parsed JSON value into a document.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(DocumentError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Names of array-valued keys, in document order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.root
            .iter()
            .filter(|(_, value)| value.is_array())
            .map(|(name, _)| name.as_str())
    }

    pub fn collection(&self, name: &str) -> Option<&Vec<Value>> {
        self.root.get(name).and_then(Value::as_array)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collection(name).is_some()
    }

    /// `name` is present but holds something other than an array.
    pub fn holds_non_collection(&self, name: &str) -> bool {
        self.root.get(name).is_some_and(|value| !value.is_array())
    }

    /// Replace (or create) a collection. Existing keys keep their position.
    pub fn set_collection(&mut self, name: &str, entries: Vec<Value>) {
        self.root.insert(name.to_string(), Value::Array(entries));
    }

    /// Iterate over the object records of one collection, skipping stray entries.
    pub fn records<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Record> + use<'a> {
        self.collection(name)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }
}

/// Lookup key for an identity value.
///
/// String ids are used verbatim; any other non-null value (e.g. an extended
/// JSON `{"$oid": ...}`) is keyed by its compact JSON text.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Lookup key for a record's `_id`, if it carries one.
pub fn identity_key(record: &Record) -> Option<String> {
    record.get(ID_FIELD).and_then(id_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_object_roots() {
        let err = Document::from_value(json!([1, 2, 3])).expect_err("array root must fail");
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn collection_names_skip_non_array_keys() {
        let doc = Document::from_value(json!({
            "users": [],
            "version": 3,
            "posts": [{"title": "hi"}],
            "meta": {"source": "scrape"}
        }))
        .expect("object root");
        let names: Vec<&str> = doc.collection_names().collect();
        assert_eq!(names, vec!["users", "posts"]);
        assert!(doc.holds_non_collection("meta"));
        assert!(!doc.holds_non_collection("posts"));
        assert!(!doc.holds_non_collection("absent"));
    }

    #[test]
    fn records_skip_stray_entries() {
        let doc = Document::from_value(json!({
            "tags": ["loose", {"name": "kept"}, 7]
        }))
        .expect("object root");
        assert_eq!(doc.records("tags").count(), 1);
        assert_eq!(doc.records("missing").count(), 0);
    }

    #[test]
    fn set_collection_keeps_key_position() {
        let mut doc = Document::from_value(json!({"a": [], "b": [], "c": []})).expect("object");
        doc.set_collection("b", vec![json!({"x": 1})]);
        let names: Vec<&str> = doc.collection_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(doc.collection("b").map(Vec::len), Some(1));
    }

    #[test]
    fn identity_key_handles_non_string_ids() {
        let record = json!({"_id": {"$oid": "abc"}});
        let key = identity_key(record.as_object().expect("object"));
        assert_eq!(key.as_deref(), Some(r#"{"$oid":"abc"}"#));

        let null_id = json!({"_id": null});
        assert_eq!(identity_key(null_id.as_object().expect("object")), None);
    }
}
