//! Fingerprint-deduplicating collection merge.
//!
//! Origin records are folded into the target collection one at a time:
//!
//! 1. content already present in the target → skipped
//! 2. `_id` present in the target with different content → identity
//!    collision, resolved by [`ConflictPolicy`]
//! 3. otherwise → appended, and visible to later origin records
//!
//! Running the same merge twice is a no-op the second time because every
//! origin record is then fingerprint-matched.

use crate::document::{Document, Record, identity_key};
use crate::fingerprint::{Fingerprint, fingerprint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// How an identity collision is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep the target's record; the origin record is dropped.
    #[default]
    KeepTarget,
    /// Replace the target's record in place with the origin record.
    OverwriteWithOrigin,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepTarget => "keep-target",
            Self::OverwriteWithOrigin => "overwrite-with-origin",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep-target" => Ok(Self::KeepTarget),
            "overwrite-with-origin" => Ok(Self::OverwriteWithOrigin),
            other => Err(format!(
                "unknown conflict policy `{other}` (expected keep-target or overwrite-with-origin)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
    pub overwritten: usize,
    /// Ids involved in identity collisions, in encounter order.
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: Document,
    pub stats: BTreeMap<String, MergeStats>,
}

impl MergeOutcome {
    pub fn added(&self) -> usize {
        self.stats.values().map(|s| s.added).sum()
    }

    pub fn skipped(&self) -> usize {
        self.stats.values().map(|s| s.skipped).sum()
    }

    pub fn overwritten(&self) -> usize {
        self.stats.values().map(|s| s.overwritten).sum()
    }

    pub fn conflicts(&self) -> usize {
        self.stats.values().map(|s| s.conflicts.len()).sum()
    }

    /// Whether the target document differs from its input.
    pub fn changed(&self) -> bool {
        self.added() > 0 || self.overwritten() > 0
    }
}

/// Merge every collection of `origin` into a copy of `target`.
pub fn merge_documents(target: &Document, origin: &Document, policy: ConflictPolicy) -> MergeOutcome {
    let mut document = target.clone();
    let mut stats = BTreeMap::new();

    for name in origin.collection_names() {
        if target.holds_non_collection(name) {
            tracing::warn!(collection = name, "target value is not an array, collection not merged");
            continue;
        }
        let existing = target.collection(name).map(Vec::as_slice).unwrap_or_default();
        let mut builder = CollectionBuilder::new(name, existing);
        let mut collection_stats = MergeStats::default();

        for entry in origin.collection(name).into_iter().flatten() {
            match entry {
                Value::Object(record) => builder.offer(record, policy, &mut collection_stats),
                _ => tracing::debug!(collection = name, "ignoring stray origin entry"),
            }
        }

        document.set_collection(name, builder.finish());
        stats.insert(name.to_string(), collection_stats);
    }

    MergeOutcome { document, stats }
}

/// Target collection under construction, with its content and identity indexes.
struct CollectionBuilder<'a> {
    name: &'a str,
    entries: Vec<Value>,
    fingerprints: HashMap<Fingerprint, usize>,
    ids: HashMap<String, IdSlot>,
}

struct IdSlot {
    position: usize,
    fingerprint: Fingerprint,
}

impl<'a> CollectionBuilder<'a> {
    fn new(name: &'a str, existing: &[Value]) -> Self {
        let mut builder = Self {
            name,
            entries: existing.to_vec(),
            fingerprints: HashMap::new(),
            ids: HashMap::new(),
        };
        for (position, entry) in existing.iter().enumerate() {
            if let Value::Object(record) = entry {
                let fp = fingerprint(record);
                builder.register(record, position, fp);
            }
        }
        builder
    }

    fn register(&mut self, record: &Record, position: usize, fp: Fingerprint) {
        *self.fingerprints.entry(fp.clone()).or_default() += 1;
        if let Some(id) = identity_key(record) {
            self.ids.entry(id).or_insert(IdSlot {
                position,
                fingerprint: fp,
            });
        }
    }

    fn forget_fingerprint(&mut self, fp: &Fingerprint) {
        if let Some(count) = self.fingerprints.get_mut(fp) {
            *count -= 1;
            if *count == 0 {
                self.fingerprints.remove(fp);
            }
        }
    }

    fn offer(&mut self, record: &Record, policy: ConflictPolicy, stats: &mut MergeStats) {
        let fp = fingerprint(record);
        if self.fingerprints.contains_key(&fp) {
            stats.skipped += 1;
            tracing::debug!(collection = self.name, fingerprint = %fp.short(12), "duplicate content, skipped");
            return;
        }

        let id = identity_key(record);
        if let Some(id) = id.as_deref()
            && let Some(slot) = self.ids.get(id)
        {
            let position = slot.position;
            let previous = slot.fingerprint.clone();
            stats.conflicts.push(id.to_string());
            match policy {
                ConflictPolicy::KeepTarget => {
                    tracing::warn!(collection = self.name, id, "identity collision, keeping target record");
                }
                ConflictPolicy::OverwriteWithOrigin => {
                    tracing::warn!(collection = self.name, id, "identity collision, overwriting with origin record");
                    self.forget_fingerprint(&previous);
                    *self.fingerprints.entry(fp.clone()).or_default() += 1;
                    self.ids.insert(
                        id.to_string(),
                        IdSlot {
                            position,
                            fingerprint: fp,
                        },
                    );
                    self.entries[position] = Value::Object(record.clone());
                    stats.overwritten += 1;
                }
            }
            return;
        }

        let position = self.entries.len();
        self.entries.push(Value::Object(record.clone()));
        self.register(record, position, fp);
        stats.added += 1;
        tracing::debug!(collection = self.name, id = id.as_deref().unwrap_or("-"), "appended origin record");
    }

    fn finish(self) -> Vec<Value> {
        self.entries
    }
}
