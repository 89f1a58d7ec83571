//! Error types for kernel operations.
//!
//! The reconciliation algorithms themselves are total. Errors only arise
//! when raw JSON is lifted into a typed document or diff.

/// Errors raised while interpreting raw JSON as a document or diff.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A backend data document must be a JSON object at the top level.
    #[error("expected a top-level JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A diff payload does not follow the `{collection: {added, modified}}` shape.
    #[error("malformed diff: {0}")]
    DiffFormat(String),
}

/// Human-readable JSON kind, used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
