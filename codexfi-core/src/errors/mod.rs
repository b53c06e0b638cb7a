//! Error types for every subsystem plus the umbrella error.

pub mod embedding_error;
pub mod extraction_error;
pub mod storage_error;

pub use embedding_error::EmbeddingError;
pub use extraction_error::ExtractionError;
pub use storage_error::StorageError;

/// Convenience alias used across the workspace.
pub type CodexfiResult<T> = Result<T, CodexfiError>;

/// Umbrella error. Subsystem errors convert in via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum CodexfiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A value failed the filter-interpolation allowlist. Programmer error;
    /// never caught internally.
    #[error("invalid {field}: {value:?} fails the id allowlist")]
    InvalidId { field: String, value: String },

    #[error("{label} timed out after {seconds}s")]
    Timeout { label: String, seconds: u64 },

    #[error("{label} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        #[source]
        source: Box<CodexfiError>,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodexfiError {
    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// Missing credentials and id-validation failures are permanent; the
    /// retry kernel gives up on them immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Embedding(e) => e.is_transient(),
            Self::Extraction(e) => e.is_transient(),
            Self::Timeout { .. } => true,
            Self::RetriesExhausted { .. } => false,
            Self::InvalidId { .. } | Self::Json(_) | Self::Io(_) => false,
        }
    }
}
