//! Replay a saved diff onto a refreshed, merged source.
//!
//! The merged source is the base; the diff overlays local customizations.
//! Upstream fields the diff does not mention survive, and dangling
//! references are warnings rather than failures.

use crate::diff::{CollectionDiff, Diff};
use crate::document::{Document, ID_FIELD, identity_key};
use crate::fingerprint::{Fingerprint, fingerprint};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyStats {
    pub modified: usize,
    pub added: usize,
    /// Modified entries whose id no longer exists in the source.
    pub missing_refs: Vec<String>,
    /// Added entries skipped because the record is already present.
    pub already_present: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub document: Document,
    pub stats: BTreeMap<String, ApplyStats>,
}

impl ApplyOutcome {
    pub fn modified(&self) -> usize {
        self.stats.values().map(|s| s.modified).sum()
    }

    pub fn added(&self) -> usize {
        self.stats.values().map(|s| s.added).sum()
    }

    pub fn warnings(&self) -> usize {
        self.stats
            .values()
            .map(|s| s.missing_refs.len() + s.already_present.len())
            .sum()
    }
}

/// Overlay `diff` onto a copy of `merged_source`.
pub fn apply_diff(merged_source: &Document, diff: &Diff) -> ApplyOutcome {
    let mut document = merged_source.clone();
    let mut stats = BTreeMap::new();

    for (name, collection_diff) in diff.collections() {
        if merged_source.holds_non_collection(name) {
            tracing::warn!(collection = name, "source value is not an array, diff not applied");
            continue;
        }
        let mut entries = merged_source.collection(name).cloned().unwrap_or_default();
        let collection_stats = apply_collection(name, &mut entries, collection_diff);
        document.set_collection(name, entries);
        stats.insert(name.to_string(), collection_stats);
    }

    ApplyOutcome { document, stats }
}

fn apply_collection(name: &str, entries: &mut Vec<Value>, diff: &CollectionDiff) -> ApplyStats {
    let mut stats = ApplyStats::default();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for (position, entry) in entries.iter().enumerate() {
        if let Value::Object(record) = entry
            && let Some(id) = identity_key(record)
        {
            by_id.entry(id).or_insert(position);
        }
    }

    for modified in &diff.modified {
        let Some(id) = modified.id_key() else {
            tracing::warn!(collection = name, "modified entry without _id, skipped");
            stats.missing_refs.push(modified.id.to_string());
            continue;
        };
        let target = by_id
            .get(&id)
            .and_then(|&position| entries.get_mut(position))
            .and_then(Value::as_object_mut);
        let Some(record) = target else {
            tracing::warn!(collection = name, id = %id, "referenced record no longer in source, skipped");
            stats.missing_refs.push(id);
            continue;
        };
        for (field, value) in &modified.changes {
            if field != ID_FIELD {
                record.insert(field.clone(), value.clone());
            }
        }
        stats.modified += 1;
    }

    let mut content: Option<HashSet<Fingerprint>> = None;
    for added in &diff.added {
        match identity_key(added) {
            Some(id) if by_id.contains_key(&id) => {
                tracing::warn!(collection = name, id = %id, "added record already present, skipped");
                stats.already_present.push(id);
            }
            Some(id) => {
                if let Some(present) = content.as_mut() {
                    present.insert(fingerprint(added));
                }
                by_id.insert(id, entries.len());
                entries.push(Value::Object(added.clone()));
                stats.added += 1;
            }
            None => {
                let present = content.get_or_insert_with(|| {
                    entries
                        .iter()
                        .filter_map(Value::as_object)
                        .map(fingerprint)
                        .collect()
                });
                let fp = fingerprint(added);
                if present.insert(fp.clone()) {
                    entries.push(Value::Object(added.clone()));
                    stats.added += 1;
                } else {
                    tracing::warn!(collection = name, fingerprint = %fp.short(12), "added record already present, skipped");
                    stats.already_present.push(format!("content:{}", fp.short(12)));
                }
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::generate_diff;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).expect("fixture must be an object")
    }

    fn diff(value: Value) -> Diff {
        Diff::from_value(value).expect("fixture must be a diff")
    }

    #[test]
    fn overlays_changes_and_keeps_upstream_fields() {
        let source = doc(json!({"users": [{"_id": "u1", "name": "Alice", "age": 30, "country": "CN"}]}));
        let patch = diff(json!({"users": {"modified": [{"_id": "u1", "changes": {"age": 31}}]}}));

        let outcome = apply_diff(&source, &patch);
        assert_eq!(
            outcome.document.collection("users").expect("users")[0],
            json!({"_id": "u1", "name": "Alice", "age": 31, "country": "CN"})
        );
        assert_eq!(outcome.modified(), 1);
    }

    #[test]
    fn missing_reference_is_a_warning() {
        let source = doc(json!({"users": [{"_id": "u1"}]}));
        let patch = diff(json!({"users": {"modified": [{"_id": "gone", "changes": {"a": 1}}]}}));

        let outcome = apply_diff(&source, &patch);
        assert_eq!(outcome.document, source);
        assert_eq!(outcome.stats["users"].missing_refs, vec!["gone".to_string()]);
        assert_eq!(outcome.warnings(), 1);
    }

    #[test]
    fn collections_outside_the_diff_pass_through() {
        let source = doc(json!({"users": [{"_id": "u1"}], "posts": ["stray", {"_id": "p1"}], "v": 2}));
        let patch = diff(json!({"users": {"added": [{"_id": "u2"}]}}));

        let outcome = apply_diff(&source, &patch);
        assert_eq!(outcome.document.collection("posts"), source.collection("posts"));
        assert_eq!(outcome.document.as_map()["v"], 2);
        assert_eq!(outcome.document.collection("users").map(Vec::len), Some(2));
    }

    #[test]
    fn diff_only_collections_are_created() {
        let source = doc(json!({"users": []}));
        let patch = diff(json!({"drafts": {"added": [{"_id": "d1", "t": "x"}]}}));

        let outcome = apply_diff(&source, &patch);
        assert_eq!(
            outcome.document.collection("drafts"),
            Some(&vec![json!({"_id": "d1", "t": "x"})])
        );
    }

    #[test]
    fn non_array_source_values_are_left_alone() {
        let source = doc(json!({"meta": {"version": 3}, "users": []}));
        let patch = diff(json!({"meta": {"added": [{"_id": "m1"}]}}));

        let outcome = apply_diff(&source, &patch);
        assert_eq!(outcome.document, source);
        assert!(!outcome.stats.contains_key("meta"));
    }

    #[test]
    fn apply_is_idempotent() {
        let source = doc(json!({"users": [{"_id": "u1", "age": 30}]}));
        let patch = diff(json!({"users": {
            "modified": [{"_id": "u1", "changes": {"age": 31}}],
            "added": [{"_id": "u2", "age": 25}, {"age": 40}]
        }}));

        let once = apply_diff(&source, &patch);
        let twice = apply_diff(&once.document, &patch);
        assert_eq!(twice.document, once.document);
        assert_eq!(twice.added(), 0);
        assert_eq!(twice.stats["users"].already_present.len(), 2);
    }

    #[test]
    fn round_trip_reproduces_the_derived_document() {
        let source = doc(json!({
            "users": [
                {"_id": "u1", "name": "Alice", "age": 30},
                {"_id": "u2", "name": "Bob", "age": 25}
            ],
            "posts": [{"_id": "p1", "title": "hello", "tags": ["a"]}]
        }));
        let derived = doc(json!({
            "users": [
                {"_id": "u1", "name": "Alice", "age": 30},
                {"_id": "u2", "name": "Bob", "age": 26, "vip": true}
            ],
            "posts": [
                {"_id": "p1", "title": "hello", "tags": ["a", "b"]},
                {"_id": "p2", "title": "new"}
            ]
        }));

        let generated = generate_diff(&source, &derived);
        let outcome = apply_diff(&source, &generated.diff);
        assert_eq!(outcome.document, derived);
    }
}
