//! Structural outlines of documents.
//!
//! Useful when eyeballing an unfamiliar fixture: every scalar is replaced
//! by its type name and arrays are collapsed to a sample plus a count.

use crate::document::Document;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Strings longer than this report their length.
const LONG_STRING_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionShape {
    pub name: String,
    pub records: usize,
    /// Shape of the first entry, `null` for an empty collection.
    pub sample: Value,
}

/// Outline of a JSON value, sampling `max_samples` leading array items.
pub fn shape_of(value: &Value, max_samples: usize) -> Value {
    match value {
        Value::Null => json!("null"),
        Value::Bool(_) => json!("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!("integer"),
        Value::Number(_) => json!("number"),
        Value::String(s) => {
            let chars = s.chars().count();
            if chars > LONG_STRING_CHARS {
                json!(format!("string (len={chars})"))
            } else {
                json!("string")
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return json!("[]");
            }
            let shapes: Vec<Value> = items
                .iter()
                .take(max_samples.max(1))
                .map(|item| shape_of(item, max_samples))
                .collect();
            let uniform = shapes.windows(2).all(|pair| pair[0] == pair[1]);
            let count = if uniform {
                format!("... ({} items)", items.len())
            } else {
                format!("... ({} items, mixed types)", items.len())
            };
            json!([shapes[0].clone(), count])
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), shape_of(value, max_samples)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

/// Record count and first-entry shape for every collection, in document order.
pub fn document_summary(document: &Document) -> Vec<CollectionShape> {
    document
        .collection_names()
        .map(|name| {
            let entries = document.collection(name).map(Vec::as_slice).unwrap_or_default();
            CollectionShape {
                name: name.to_string(),
                records: entries.len(),
                sample: entries
                    .first()
                    .map(|entry| shape_of(entry, 1))
                    .unwrap_or(Value::Null),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_map_to_type_names() {
        assert_eq!(shape_of(&json!(null), 1), "null");
        assert_eq!(shape_of(&json!(true), 1), "boolean");
        assert_eq!(shape_of(&json!(3), 1), "integer");
        assert_eq!(shape_of(&json!(3.5), 1), "number");
        assert_eq!(shape_of(&json!("hi"), 1), "string");
        assert_eq!(shape_of(&json!("x".repeat(101)), 1), "string (len=101)");
    }

    #[test]
    fn arrays_collapse_to_sample_and_count() {
        assert_eq!(shape_of(&json!([]), 1), "[]");
        assert_eq!(
            shape_of(&json!([{"a": 1}, {"a": 2}]), 1),
            json!([{"a": "integer"}, "... (2 items)"])
        );
        assert_eq!(
            shape_of(&json!([1, "two"]), 2),
            json!(["integer", "... (2 items, mixed types)"])
        );
    }

    #[test]
    fn summary_lists_collections_in_order() {
        let document = Document::from_value(json!({
            "users": [{"_id": "u1", "age": 3}],
            "meta": {"v": 1},
            "empty": []
        }))
        .expect("object");
        let summary = document_summary(&document);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "users");
        assert_eq!(summary[0].sample, json!({"_id": "string", "age": "integer"}));
        assert_eq!(summary[1].records, 0);
        assert_eq!(summary[1].sample, Value::Null);
    }
}
