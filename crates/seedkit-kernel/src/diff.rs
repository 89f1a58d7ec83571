//! Sparse per-record, per-field deltas between a source and a derived
//! ("backend") document.
//!
//! Backend records are paired with source records by `_id` first and by
//! content fingerprint second, which recovers pairs whose ids were
//! regenerated. Each source record backs at most one backend record.
//! Modified entries are keyed by the *source* id so a diff can be replayed
//! on a later re-merge of the source.

use crate::document::{Document, ID_FIELD, Record, id_key, identity_key};
use crate::equality::values_equal;
use crate::error::DocumentError;
use crate::fingerprint::{Fingerprint, fingerprint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Field-level changes for one source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedRecord {
    #[serde(rename = "_id")]
    pub id: Value,
    pub changes: Record,
}

impl ModifiedRecord {
    pub fn id_key(&self) -> Option<String> {
        id_key(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDiff {
    #[serde(default)]
    pub added: Vec<Record>,
    #[serde(default)]
    pub modified: Vec<ModifiedRecord>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty()
    }
}

/// Collection name → changes. Collections without changes are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diff {
    collections: BTreeMap<String, CollectionDiff>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a diff file payload.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        serde_json::from_value(value).map_err(|e| DocumentError::DiffFormat(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("diff serialization")
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(CollectionDiff::is_empty)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDiff> {
        self.collections.get(name)
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &CollectionDiff)> {
        self.collections
            .iter()
            .map(|(name, diff)| (name.as_str(), diff))
    }

    /// Insert a collection's changes, dropping it if there are none.
    pub fn insert(&mut self, name: impl Into<String>, diff: CollectionDiff) {
        if !diff.is_empty() {
            self.collections.insert(name.into(), diff);
        }
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub matched_by_id: usize,
    pub matched_by_content: usize,
}

#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub diff: Diff,
    pub stats: BTreeMap<String, DiffStats>,
}

/// Compute the diff from `source` to `backend` over their common collections.
pub fn generate_diff(source: &Document, backend: &Document) -> DiffOutcome {
    let mut diff = Diff::new();
    let mut stats = BTreeMap::new();

    for name in backend.collection_names() {
        if !source.has_collection(name) {
            tracing::debug!(collection = name, "collection absent from source, not diffed");
            continue;
        }
        let (collection_diff, collection_stats) =
            diff_collection(name, source.records(name), backend.records(name));
        stats.insert(name.to_string(), collection_stats);
        diff.insert(name, collection_diff);
    }

    DiffOutcome { diff, stats }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    ById,
    ByContent,
}

/// Source records of one collection, indexed for hybrid matching.
struct SourceIndex<'a> {
    records: Vec<&'a Record>,
    by_id: HashMap<String, usize>,
    by_fingerprint: HashMap<Fingerprint, Vec<usize>>,
    claimed: Vec<bool>,
}

impl<'a> SourceIndex<'a> {
    fn build(records: impl Iterator<Item = &'a Record>) -> Self {
        let records: Vec<&Record> = records.collect();
        let mut by_id = HashMap::new();
        let mut by_fingerprint: HashMap<Fingerprint, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if let Some(id) = identity_key(record) {
                by_id.entry(id).or_insert(idx);
            }
            by_fingerprint
                .entry(fingerprint(record))
                .or_default()
                .push(idx);
        }
        let claimed = vec![false; records.len()];
        Self {
            records,
            by_id,
            by_fingerprint,
            claimed,
        }
    }

    /// Claim the unclaimed source record carrying the same `_id`.
    fn claim_by_id(&mut self, record: &Record) -> Option<(&'a Record, MatchKind)> {
        let id = identity_key(record)?;
        let idx = *self.by_id.get(&id)?;
        if self.claimed[idx] {
            return None;
        }
        self.claimed[idx] = true;
        Some((self.records[idx], MatchKind::ById))
    }

    /// Claim the first unclaimed source record with the same content.
    fn claim_by_content(&mut self, record: &Record) -> Option<(&'a Record, MatchKind)> {
        let candidates = self.by_fingerprint.get(&fingerprint(record))?;
        let idx = candidates
            .iter()
            .copied()
            .find(|&idx| !self.claimed[idx])?;
        self.claimed[idx] = true;
        Some((self.records[idx], MatchKind::ByContent))
    }
}

fn diff_collection<'a>(
    name: &str,
    source: impl Iterator<Item = &'a Record>,
    backend: impl Iterator<Item = &'a Record>,
) -> (CollectionDiff, DiffStats) {
    let mut index = SourceIndex::build(source);
    let mut diff = CollectionDiff::default();
    let mut stats = DiffStats::default();

    // Every id match is settled before any content match, so a content
    // duplicate earlier in the backend cannot take a source record that a
    // later backend record names by id.
    let backend: Vec<&Record> = backend.collect();
    let mut pairs: Vec<_> = backend
        .iter()
        .map(|record| index.claim_by_id(record))
        .collect();
    for (pair, record) in pairs.iter_mut().zip(&backend) {
        if pair.is_none() {
            *pair = index.claim_by_content(record);
        }
    }

    for (record, pair) in backend.into_iter().zip(pairs) {
        let Some((matched, kind)) = pair else {
            tracing::debug!(collection = name, id = ?identity_key(record), "added");
            diff.added.push(record.clone());
            stats.added += 1;
            continue;
        };

        match kind {
            MatchKind::ById => stats.matched_by_id += 1,
            MatchKind::ByContent => stats.matched_by_content += 1,
        }

        let changes = field_changes(matched, record);
        if changes.is_empty() {
            stats.unchanged += 1;
            continue;
        }

        // Content matches never carry changes, so `matched` was found by id.
        let source_id = matched.get(ID_FIELD).cloned().unwrap_or_default();
        tracing::debug!(
            collection = name,
            id = %source_id,
            fields = changes.len(),
            "modified"
        );
        diff.modified.push(ModifiedRecord {
            id: source_id,
            changes,
        });
        stats.modified += 1;
    }

    (diff, stats)
}

/// Fields of `derived` (minus `_id`) whose values differ from `source`.
pub fn field_changes(source: &Record, derived: &Record) -> Record {
    derived
        .iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD)
        .filter(|(key, value)| {
            source
                .get(key.as_str())
                .is_none_or(|original| !values_equal(original, value))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
