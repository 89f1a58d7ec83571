//! # seedkit-store
//!
//! File layer for backend data documents.
//!
//! This crate provides:
//! - validated JSON reads (UTF-8, no NUL bytes, object root)
//! - atomic pretty-printed writes
//! - the sibling `.backup/` and `.diff/` layout
//! - `seedkit.toml` settings
//! - directory batches and whole-file dedupe
//!
//! It intentionally holds no reconciliation logic; that lives in
//! `seedkit-kernel`.
//!
//! ## Layout
//!
//! ```text
//! fixtures/
//!   task-001.json               target file
//!   .backup/task-001.json       verbatim copy taken before each rewrite
//!   .diff/task-001.diff.json    saved customizations
//! ```

pub mod config;
pub mod dedupe;
pub mod diff_file;
pub mod error;
pub mod json_file;
pub mod layout;

pub use config::{DEFAULT_CONFIG_FILE, IdSettings, MergeSettings, Settings};
pub use dedupe::{DedupePlan, apply_dedupe, plan_dedupe};
pub use diff_file::{load_diff, load_diff_for, save_diff_for};
pub use error::StoreError;
pub use json_file::{
    load_document, read_json, require_json_extension, save_document, to_pretty_json, write_json,
};
pub use layout::{DEFAULT_BACKUP_DIR, DEFAULT_DIFF_DIR, DIFF_SUFFIX, Layout, list_json_files, resolve};
