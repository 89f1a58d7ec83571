//! Sibling directory layout for backups and diffs, and path helpers.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKUP_DIR: &str = ".backup";
pub const DEFAULT_DIFF_DIR: &str = ".diff";
pub const DIFF_SUFFIX: &str = ".diff.json";

/// Names of the sibling directories used next to every target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    pub backup_dir: String,
    pub diff_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
            diff_dir: DEFAULT_DIFF_DIR.to_string(),
        }
    }
}

impl Layout {
    /// `<dir>/.backup/<filename>` for `<dir>/<filename>`.
    pub fn backup_path(&self, file: &Path) -> PathBuf {
        let name = file.file_name().unwrap_or(file.as_os_str());
        sibling_dir(file, &self.backup_dir).join(name)
    }

    /// `<dir>/.diff/<stem>.diff.json` for `<dir>/<stem>.json`.
    pub fn diff_path(&self, file: &Path) -> PathBuf {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        sibling_dir(file, &self.diff_dir).join(format!("{stem}{DIFF_SUFFIX}"))
    }

    /// Copy `file` byte-for-byte into its backup location.
    pub fn backup(&self, file: &Path) -> Result<PathBuf, StoreError> {
        let backup_path = self.backup_path(file);
        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::copy(file, &backup_path).map_err(|e| StoreError::io(file, e))?;
        tracing::info!(
            file = %file.display(),
            backup = %backup_path.display(),
            "backed up file"
        );
        Ok(backup_path)
    }

    /// Directory names must be single, non-empty path components.
    pub fn validate(&self) -> Result<(), String> {
        for (key, value) in [("backup_dir", &self.backup_dir), ("diff_dir", &self.diff_dir)] {
            let component_count = Path::new(value).components().count();
            let special = value == "." || value == "..";
            if value.is_empty() || special || component_count != 1 || value.contains(['/', '\\'])
            {
                return Err(format!("layout.{key} must be a single directory name, got `{value}`"));
            }
        }
        Ok(())
    }
}

fn sibling_dir(file: &Path, name: &str) -> PathBuf {
    file.parent().unwrap_or(Path::new("")).join(name)
}

/// Resolve a user-supplied path against an explicit base directory.
pub fn resolve(base: &Path, input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    if input.is_absolute() {
        input.to_path_buf()
    } else {
        base.join(input)
    }
}

/// `*.json` files directly inside `dir`, sorted by file name.
///
/// Hidden entries (names starting with `.`) are skipped, which keeps the
/// backup and diff directories and any temp files out of batches.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::NotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !hidden && is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
