//! Whole-file dedupe for a directory of fixtures.
//!
//! Files whose parsed contents hash equal under the canonical encoding are
//! duplicates. The first file in name order survives; later ones are backed
//! up and removed. The mapping records, for every file stem, the stem that
//! now holds its content.

use crate::error::StoreError;
use crate::json_file::{read_json, write_json};
use crate::layout::{Layout, list_json_files};
use seedkit_kernel::{Fingerprint, fingerprint_value};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupePlan {
    /// File stem → surviving file stem (itself for survivors).
    pub mapping: BTreeMap<String, String>,
    /// Files to remove, in name order.
    pub duplicates: Vec<PathBuf>,
    /// Files left untouched because they could not be read or their stem
    /// was already taken by an earlier file.
    pub skipped: Vec<String>,
}

impl DedupePlan {
    /// Files that keep their content, i.e. map to themselves.
    pub fn unique(&self) -> usize {
        self.mapping
            .iter()
            .filter(|(stem, survivor)| stem == survivor)
            .count()
    }

    pub fn mapping_value(&self) -> Value {
        let map: Map<String, Value> = self
            .mapping
            .iter()
            .map(|(stem, survivor)| (stem.clone(), Value::String(survivor.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Group the `*.json` files in `dir` by content. `exclude` (usually the
/// mapping file itself) is never considered.
pub fn plan_dedupe(dir: &Path, exclude: Option<&Path>) -> Result<DedupePlan, StoreError> {
    let excluded = exclude.map(canonical_or_self);
    let mut plan = DedupePlan::default();
    let mut survivors: HashMap<Fingerprint, String> = HashMap::new();

    for file in list_json_files(dir)? {
        if excluded.as_ref() == Some(&canonical_or_self(&file)) {
            continue;
        }
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if plan.mapping.contains_key(&stem) {
            tracing::warn!(file = %file.display(), stem = %stem, "stem already mapped, skipping file");
            plan.skipped.push(format!(
                "{}: file stem `{stem}` is already mapped by an earlier file",
                file.display()
            ));
            continue;
        }
        let value = match read_json(&file) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "skipping unreadable file");
                plan.skipped.push(err.to_string());
                continue;
            }
        };
        let hash = fingerprint_value(&value);
        match survivors.get(&hash) {
            Some(survivor) => {
                tracing::debug!(file = %file.display(), survivor = %survivor, "duplicate file");
                plan.mapping.insert(stem, survivor.clone());
                plan.duplicates.push(file);
            }
            None => {
                survivors.insert(hash, stem.clone());
                plan.mapping.insert(stem.clone(), stem);
            }
        }
    }
    Ok(plan)
}

/// Write the mapping, then back up and delete each duplicate.
pub fn apply_dedupe(
    plan: &DedupePlan,
    layout: &Layout,
    mapping_path: &Path,
) -> Result<(), StoreError> {
    write_json(mapping_path, &plan.mapping_value())?;
    for file in &plan.duplicates {
        layout.backup(file)?;
        fs::remove_file(file).map_err(|e| StoreError::io(file, e))?;
        tracing::info!(file = %file.display(), "removed duplicate file");
    }
    Ok(())
}

fn canonical_or_self(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "seedkit-dedupe-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        path
    }

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).expect("fixture should write");
    }

    #[test]
    fn equivalent_files_map_to_the_first_name() {
        let dir = temp_dir("plan");
        write(&dir, "a.json", r#"{"users": [{"n": 1, "m": 2}]}"#);
        write(&dir, "b.json", r#"{"users": [{"m": 2, "n": 1}]}"#);
        write(&dir, "c.json", r#"{"users": []}"#);

        let plan = plan_dedupe(&dir, None).expect("plan");
        assert_eq!(plan.mapping["a"], "a");
        assert_eq!(plan.mapping["b"], "a");
        assert_eq!(plan.mapping["c"], "c");
        assert_eq!(plan.duplicates, vec![dir.join("b.json")]);
        assert_eq!(plan.unique(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn apply_removes_duplicates_after_backing_them_up() {
        let dir = temp_dir("apply");
        write(&dir, "a.json", r#"{"x": [1]}"#);
        write(&dir, "b.json", r#"{ "x" : [1] }"#);
        let mapping_path = dir.join("mapping.json");

        let plan = plan_dedupe(&dir, Some(&mapping_path)).expect("plan");
        apply_dedupe(&plan, &Layout::default(), &mapping_path).expect("apply");

        assert!(dir.join("a.json").is_file());
        assert!(!dir.join("b.json").exists());
        assert!(dir.join(".backup/b.json").is_file());
        let mapping = read_json(&mapping_path).expect("mapping written");
        assert_eq!(mapping, serde_json::json!({"a": "a", "b": "a"}));

        // A second run ignores the mapping file and finds nothing to do.
        let again = plan_dedupe(&dir, Some(&mapping_path)).expect("plan");
        assert!(again.duplicates.is_empty());
        assert!(!again.mapping.contains_key("mapping"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stems_differing_only_in_extension_case_are_skipped() {
        let dir = temp_dir("stem-case");
        write(&dir, "a.json", "{}");
        write(&dir, "a.JSON", "{}");
        write(&dir, "a.Json", "{}");

        let plan = plan_dedupe(&dir, None).expect("plan");
        assert_eq!(plan.mapping.len(), 1);
        assert_eq!(plan.mapping["a"], "a");
        assert!(plan.duplicates.is_empty());
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(plan.unique(), 1);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = temp_dir("skip");
        write(&dir, "a.json", "{}");
        write(&dir, "broken.json", "{");

        let plan = plan_dedupe(&dir, None).expect("plan");
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.mapping.len(), 1);

        let _ = fs::remove_dir_all(dir);
    }
}
