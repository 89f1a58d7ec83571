//! `seedkit.toml` settings.
//!
//! ```toml
//! [layout]
//! backup_dir = ".backup"
//! diff_dir = ".diff"
//!
//! [ids]
//! hash_length = 12
//!
//! [merge]
//! conflict_policy = "keep-target"
//! ```
//!
//! Every table and key is optional. Unknown keys are rejected.

use crate::error::StoreError;
use crate::layout::Layout;
use seedkit_kernel::{ConflictPolicy, DEFAULT_ID_HASH_LEN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "seedkit.toml";

const HASH_LENGTH_RANGE: RangeInclusive<usize> = 4..=64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub layout: Layout,
    pub ids: IdSettings,
    pub merge: MergeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdSettings {
    /// Hex characters of the content hash kept in generated ids.
    pub hash_length: usize,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            hash_length: DEFAULT_ID_HASH_LEN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    /// Used when `--overwrite-conflicts` is not given.
    pub conflict_policy: ConflictPolicy,
}

impl Settings {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, StoreError> {
        let settings: Settings = toml::from_str(text).map_err(|e| StoreError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        settings.validate().map_err(|message| StoreError::Config {
            path: path.display().to_string(),
            message,
        })?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&text, path)
    }

    /// Load `path` if it exists.
    ///
    /// A missing file yields the defaults unless the caller named it
    /// explicitly, in which case it is an error.
    pub fn load_or_default(path: &Path, explicit: bool) -> Result<Self, StoreError> {
        if path.is_file() {
            let settings = Self::load(path)?;
            tracing::debug!(path = %path.display(), "loaded settings");
            return Ok(settings);
        }
        if explicit {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !HASH_LENGTH_RANGE.contains(&self.ids.hash_length) {
            return Err(format!(
                "ids.hash_length must be between {} and {}, got {}",
                HASH_LENGTH_RANGE.start(),
                HASH_LENGTH_RANGE.end(),
                self.ids.hash_length
            ));
        }
        self.layout.validate()
    }
}
