pub mod apply_diff;
pub mod dedupe_files;
pub mod generate_collection_ids;
pub mod generate_diff;
pub mod merge_data;
pub mod shape;
pub mod sync_ids;
