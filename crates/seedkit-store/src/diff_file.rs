//! Saved customizations under the sibling diff directory.

use crate::error::StoreError;
use crate::json_file::{read_json, write_json};
use crate::layout::Layout;
use seedkit_kernel::Diff;
use std::path::{Path, PathBuf};

pub fn load_diff(path: impl AsRef<Path>) -> Result<Diff, StoreError> {
    let path = path.as_ref();
    let value = read_json(path)?;
    Diff::from_value(value).map_err(|source| StoreError::Document {
        path: path.display().to_string(),
        source,
    })
}

/// The saved diff for `target`, or `None` if none has been generated.
pub fn load_diff_for(layout: &Layout, target: &Path) -> Result<Option<Diff>, StoreError> {
    let path = layout.diff_path(target);
    if !path.is_file() {
        tracing::debug!(target = %target.display(), diff = %path.display(), "no saved diff");
        return Ok(None);
    }
    load_diff(&path).map(Some)
}

pub fn save_diff_for(layout: &Layout, target: &Path, diff: &Diff) -> Result<PathBuf, StoreError> {
    let path = layout.diff_path(target);
    write_json(&path, &diff.to_value())?;
    Ok(path)
}
