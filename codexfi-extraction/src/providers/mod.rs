//! Provider clients. Each submodule issues exactly one HTTP call with a
//! 60-second abort and normalizes the response to text + token usage.

mod anthropic;
mod google;
mod openai;

use codexfi_core::config::ExtractionProvider;
use codexfi_core::errors::CodexfiResult;

/// Token usage normalized across providers. Providers that do not report
/// cached reads leave `cached_tokens` at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderUsage {
    pub prompt_tokens: u64,
    pub cached_tokens: u64,
    pub completion_tokens: u64,
}

/// Issue one call against `provider`.
pub async fn call(
    provider: ExtractionProvider,
    http: &reqwest::Client,
    api_key: &str,
    system: &str,
    user: &str,
) -> CodexfiResult<(String, ProviderUsage)> {
    match provider {
        ExtractionProvider::Openai => openai::call(http, api_key, system, user).await,
        ExtractionProvider::Anthropic => anthropic::call(http, api_key, system, user).await,
        ExtractionProvider::Google => google::call(http, api_key, system, user).await,
    }
}

/// Classify an HTTP status for the dispatch loop: 429 and 5xx are
/// transient, anything else non-2xx is a permanent provider response.
pub(crate) fn status_error(
    provider: &str,
    status: reqwest::StatusCode,
) -> codexfi_core::errors::ExtractionError {
    use codexfi_core::errors::ExtractionError;
    if status.is_server_error() || status.as_u16() == 429 {
        ExtractionError::ProviderFailed {
            provider: provider.to_string(),
            reason: format!("http {status}"),
        }
    } else {
        ExtractionError::BadResponse {
            provider: provider.to_string(),
            reason: format!("http {status}"),
        }
    }
}
