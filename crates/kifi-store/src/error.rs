/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a JSON object of strings.
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
