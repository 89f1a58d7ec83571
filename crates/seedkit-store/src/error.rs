use seedkit_kernel::DocumentError;

/// Errors from file operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("corrupted input: {0}")]
    Corrupt(String),

    #[error("not a .json file: {0}")]
    NotJson(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{path}: invalid config: {message}")]
    Config { path: String, message: String },

    #[error("{path}: {source}")]
    Document {
        path: String,
        #[source]
        source: DocumentError,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
