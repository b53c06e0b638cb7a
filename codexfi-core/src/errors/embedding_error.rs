/// Embedder errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Required credential absent. The caller disables the feature;
    /// retrying is pointless.
    #[error("missing credentials for {provider}")]
    MissingCredentials { provider: String },

    /// Network-level failure: timeout, 5xx, rate limit. Retryable.
    #[error("embedding request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding response malformed: {reason}")]
    BadResponse { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed { .. })
    }
}
