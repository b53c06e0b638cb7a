/// Vector-table adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to open table at {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    /// Another process committed between our read and write. Retryable.
    #[error("write conflict: {reason}")]
    WriteConflict { reason: String },

    #[error("query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("row decode failed: {reason}")]
    DecodeFailed { reason: String },
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }
}
