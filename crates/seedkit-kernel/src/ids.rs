//! Deterministic identity for identity-less records.
//!
//! A generated id is `{collection}_{fingerprint prefix}`. It is derived once,
//! from the content at assignment time; records that already carry `_id` are
//! never touched, so ids are not refreshed when content later changes.

use crate::document::{Document, ID_FIELD, Record, identity_key};
use crate::fingerprint::fingerprint;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Hex characters of the fingerprint used in generated ids.
pub const DEFAULT_ID_HASH_LEN: usize = 12;

/// Which collections an operation should visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CollectionFilter {
    #[default]
    All,
    Only(Vec<String>),
}

impl CollectionFilter {
    /// Parse a comma-separated allow-list. Blank input means every collection.
    pub fn from_csv(csv: &str) -> Self {
        let names: Vec<String> = csv
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            Self::All
        } else {
            Self::Only(names)
        }
    }

    pub fn admits(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Per-collection id assignment counts. Stray entries are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdStats {
    pub total: usize,
    pub existing: usize,
    pub assigned: usize,
}

#[derive(Debug, Clone)]
pub struct IdAssignment {
    pub document: Document,
    pub stats: BTreeMap<String, IdStats>,
    /// Requested collections that the document does not have.
    pub missing_collections: Vec<String>,
    pub available_collections: Vec<String>,
}

impl IdAssignment {
    pub fn assigned(&self) -> usize {
        self.stats.values().map(|s| s.assigned).sum()
    }

    /// An allow-list was given and none of its names exist.
    pub fn matched_nothing(&self) -> bool {
        self.stats.is_empty() && !self.missing_collections.is_empty()
    }
}

/// Id for a record in `collection`, derived from its content.
pub fn generated_id(collection: &str, record: &Record, hash_len: usize) -> String {
    format!("{collection}_{}", fingerprint(record).short(hash_len))
}

/// Give every identity-less record in the admitted collections a generated id.
pub fn assign_ids(document: &Document, filter: &CollectionFilter, hash_len: usize) -> IdAssignment {
    let available: Vec<String> = document.collection_names().map(str::to_string).collect();
    let missing = match filter {
        CollectionFilter::All => Vec::new(),
        CollectionFilter::Only(names) => names
            .iter()
            .filter(|name| !available.contains(name))
            .cloned()
            .collect(),
    };

    let mut out = document.clone();
    let mut stats = BTreeMap::new();
    for name in available.iter().filter(|name| filter.admits(name)) {
        let Some(entries) = document.collection(name) else {
            continue;
        };
        let mut collection_stats = IdStats::default();
        let updated: Vec<Value> = entries
            .iter()
            .map(|entry| match entry {
                Value::Object(record) => {
                    collection_stats.total += 1;
                    if identity_key(record).is_some() {
                        collection_stats.existing += 1;
                        entry.clone()
                    } else {
                        collection_stats.assigned += 1;
                        Value::Object(with_id(name, record, hash_len))
                    }
                }
                other => other.clone(),
            })
            .collect();

        tracing::debug!(
            collection = %name,
            total = collection_stats.total,
            existing = collection_stats.existing,
            assigned = collection_stats.assigned,
            "assigned collection ids"
        );
        out.set_collection(name, updated);
        stats.insert(name.clone(), collection_stats);
    }

    IdAssignment {
        document: out,
        stats,
        missing_collections: missing,
        available_collections: available,
    }
}

/// Copy of `record` with `_id` first, followed by its existing fields.
fn with_id(collection: &str, record: &Record, hash_len: usize) -> Record {
    let id = generated_id(collection, record, hash_len);
    tracing::debug!(collection, %id, "generated id");
    let mut out = Record::with_capacity(record.len() + 1);
    out.insert(ID_FIELD.to_string(), Value::String(id));
    for (key, value) in record {
        if key != ID_FIELD {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).expect("fixture must be an object")
    }

    #[test]
    fn assigns_ids_only_to_identity_less_records() {
        let input = doc(json!({
            "products": [
                {"_id": "keep-me", "name": "Pen"},
                {"name": "Ink", "price": 3}
            ]
        }));
        let result = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);

        let products = result.document.collection("products").expect("collection");
        assert_eq!(products[0]["_id"], "keep-me");
        let new_id = products[1]["_id"].as_str().expect("assigned id");
        assert!(new_id.starts_with("products_"));
        assert_eq!(new_id.len(), "products_".len() + DEFAULT_ID_HASH_LEN);

        let stats = result.stats["products"];
        assert_eq!(
            stats,
            IdStats {
                total: 2,
                existing: 1,
                assigned: 1
            }
        );
    }

    #[test]
    fn generated_id_leads_the_record() {
        let input = doc(json!({"posts": [{"title": "hi", "body": "there"}]}));
        let result = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        let post = result.document.collection("posts").expect("posts")[0]
            .as_object()
            .cloned()
            .expect("object");
        let keys: Vec<&str> = post.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "title", "body"]);
    }

    #[test]
    fn null_ids_are_replaced() {
        let input = doc(json!({"posts": [{"_id": null, "title": "hi"}]}));
        let result = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        assert_eq!(result.stats["posts"].assigned, 1);
        assert_eq!(result.stats["posts"].existing, 0);
        let post = result.document.collection("posts").expect("posts")[0]
            .as_object()
            .cloned()
            .expect("object");
        let id = post["_id"].as_str().expect("string id");
        assert!(id.starts_with("posts_"));
        let keys: Vec<&str> = post.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "title"]);
    }

    #[test]
    fn assignment_is_deterministic() {
        let input = doc(json!({"posts": [{"title": "a"}, {"title": "b"}]}));
        let first = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        let second = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        assert_eq!(first.document, second.document);
    }

    #[test]
    fn second_pass_assigns_nothing() {
        let input = doc(json!({"posts": [{"title": "a"}]}));
        let first = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        let second = assign_ids(&first.document, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        assert_eq!(second.assigned(), 0);
        assert_eq!(second.document, first.document);
    }

    #[test]
    fn stray_entries_pass_through_uncounted() {
        let input = doc(json!({"tags": ["loose", {"name": "x"}, 42]}));
        let result = assign_ids(&input, &CollectionFilter::All, DEFAULT_ID_HASH_LEN);
        let tags = result.document.collection("tags").expect("tags");
        assert_eq!(tags[0], "loose");
        assert_eq!(tags[2], 42);
        assert!(tags[1]["_id"].is_string());
        assert_eq!(result.stats["tags"].total, 1);
    }

    #[test]
    fn filter_restricts_collections_and_reports_missing() {
        let input = doc(json!({"a": [{"x": 1}], "b": [{"x": 1}]}));
        let filter = CollectionFilter::from_csv("b, nope");
        let result = assign_ids(&input, &filter, DEFAULT_ID_HASH_LEN);

        assert!(result.document.collection("a").expect("a")[0].get("_id").is_none());
        assert!(result.document.collection("b").expect("b")[0].get("_id").is_some());
        assert_eq!(result.missing_collections, vec!["nope".to_string()]);
        assert!(!result.matched_nothing());
    }

    #[test]
    fn filter_matching_nothing_is_reported_not_failed() {
        let input = doc(json!({"a": [{"x": 1}]}));
        let result = assign_ids(
            &input,
            &CollectionFilter::from_csv("zzz"),
            DEFAULT_ID_HASH_LEN,
        );
        assert!(result.matched_nothing());
        assert_eq!(result.available_collections, vec!["a".to_string()]);
        assert_eq!(result.document, input);
    }

    #[test]
    fn blank_csv_means_all() {
        assert_eq!(CollectionFilter::from_csv(" , "), CollectionFilter::All);
    }

    #[test]
    fn hash_length_is_configurable() {
        let record = json!({"x": 1}).as_object().cloned().expect("object");
        assert_eq!(generated_id("c", &record, 4).len(), "c_".len() + 4);
    }
}
