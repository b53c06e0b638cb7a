/// LLM provider dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing credentials for {provider}")]
    MissingCredentials { provider: String },

    /// Network failure, rate limit, or HTTP 5xx from one provider. The
    /// dispatcher retries, then falls through to the next provider.
    #[error("{provider} call failed: {reason}")]
    ProviderFailed { provider: String, reason: String },

    #[error("{provider} returned an unusable response: {reason}")]
    BadResponse { provider: String, reason: String },
}

impl ExtractionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderFailed { .. })
    }
}
