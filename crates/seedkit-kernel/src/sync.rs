//! Re-synchronize target `_id`s with a source by content fingerprint.
//!
//! After a source is re-hashed, derived files may still carry the old ids
//! for records whose content never changed. Matching on content lets those
//! ids be rewritten to the source's current ones.

use crate::document::{Document, ID_FIELD, identity_key};
use crate::fingerprint::{Fingerprint, fingerprint};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Target records whose content exists in the source.
    pub matched: usize,
    /// Matched records whose id differed and was rewritten.
    pub updated: usize,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub document: Document,
    pub stats: BTreeMap<String, SyncStats>,
}

impl SyncOutcome {
    pub fn matched(&self) -> usize {
        self.stats.values().map(|s| s.matched).sum()
    }

    pub fn updated(&self) -> usize {
        self.stats.values().map(|s| s.updated).sum()
    }
}

/// Rewrite ids of identified target records to the source id with the same content.
///
/// Only target records that already carry `_id` are considered. When several
/// source records share content, the last one's id wins.
pub fn sync_ids(source: &Document, target: &Document) -> SyncOutcome {
    let mut document = target.clone();
    let mut stats = BTreeMap::new();

    for name in target.collection_names() {
        if !source.has_collection(name) {
            continue;
        }
        let source_ids: HashMap<Fingerprint, &Value> = source
            .records(name)
            .filter(|record| identity_key(record).is_some())
            .filter_map(|record| record.get(ID_FIELD).map(|id| (fingerprint(record), id)))
            .collect();

        let mut collection_stats = SyncStats::default();
        let entries: Vec<Value> = target
            .collection(name)
            .into_iter()
            .flatten()
            .map(|entry| {
                let Value::Object(record) = entry else {
                    return entry.clone();
                };
                if identity_key(record).is_none() {
                    return entry.clone();
                }
                let Some(&source_id) = source_ids.get(&fingerprint(record)) else {
                    return entry.clone();
                };
                collection_stats.matched += 1;
                if record.get(ID_FIELD) == Some(source_id) {
                    return entry.clone();
                }
                collection_stats.updated += 1;
                tracing::debug!(
                    collection = name,
                    from = ?record.get(ID_FIELD),
                    to = %source_id,
                    "synchronized id"
                );
                let mut updated = record.clone();
                updated.insert(ID_FIELD.to_string(), source_id.clone());
                Value::Object(updated)
            })
            .collect();

        document.set_collection(name, entries);
        stats.insert(name.to_string(), collection_stats);
    }

    SyncOutcome { document, stats }
}
