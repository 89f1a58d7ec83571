//! # seedkit Kernel
//!
//! Content-addressed reconciliation of backend data documents: top-level JSON
//! objects whose array-valued keys are collections of records.
//!
//! Records carry no reliable identity a priori. Everything here is keyed on a
//! content fingerprint (SHA-256 over canonical JSON, `_id` excluded), with the
//! `_id` field used opportunistically when it is present.
//!
//! ## Architecture
//!
//! ```text
//! fingerprint / equality   ← identity-free content primitives
//!     │
//! ids                      ← {collection}_{fingerprint prefix} for identity-less records
//!     │
//! merge                    ← fingerprint-deduplicating union, explicit conflict policy
//!     │
//! diff ─────► apply        ← extract customizations, replay them onto a refreshed source
//!     │
//! sync / shape             ← id re-synchronization, structural summaries
//! ```
//!
//! Every operation takes documents by reference and returns a new document
//! together with per-collection statistics. Nothing here touches the
//! filesystem.

pub mod apply;
pub mod diff;
pub mod document;
pub mod equality;
pub mod error;
pub mod fingerprint;
pub mod ids;
pub mod merge;
pub mod shape;
pub mod sync;

pub use apply::{ApplyOutcome, ApplyStats, apply_diff};
pub use diff::{CollectionDiff, Diff, DiffOutcome, DiffStats, ModifiedRecord, generate_diff};
pub use document::{Document, ID_FIELD, Record, id_key, identity_key};
pub use equality::{objects_equal, values_equal};
pub use error::DocumentError;
pub use fingerprint::{Fingerprint, fingerprint, fingerprint_value};
pub use ids::{
    CollectionFilter, DEFAULT_ID_HASH_LEN, IdAssignment, IdStats, assign_ids, generated_id,
};
pub use merge::{ConflictPolicy, MergeOutcome, MergeStats, merge_documents};
pub use shape::{CollectionShape, document_summary, shape_of};
pub use sync::{SyncOutcome, SyncStats, sync_ids};
