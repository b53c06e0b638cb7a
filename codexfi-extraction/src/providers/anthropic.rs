//! Anthropic messages client.

use std::time::Duration;

use serde::Deserialize;

use codexfi_core::config::constants::{ANTHROPIC_MODEL, LLM_TIMEOUT_SECS};
use codexfi_core::errors::{CodexfiResult, ExtractionError};

use super::ProviderUsage;

const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
}

pub async fn call(
    http: &reqwest::Client,
    api_key: &str,
    system: &str,
    user: &str,
) -> CodexfiResult<(String, ProviderUsage)> {
    let body = serde_json::json!({
        "model": ANTHROPIC_MODEL,
        "max_tokens": MAX_TOKENS,
        "system": system,
        "messages": [{"role": "user", "content": user}],
    });

    let response = http
        .post(ENDPOINT)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
        .json(&body)
        .send()
        .await
        .map_err(|e| ExtractionError::ProviderFailed {
            provider: "anthropic".to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(super::status_error("anthropic", status).into());
    }

    let parsed: MessagesResponse =
        response
            .json()
            .await
            .map_err(|e| ExtractionError::BadResponse {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;

    let text = parsed
        .content
        .into_iter()
        .next()
        .map(|b| b.text)
        .ok_or_else(|| ExtractionError::BadResponse {
            provider: "anthropic".to_string(),
            reason: "empty content".to_string(),
        })?;

    Ok((
        text,
        ProviderUsage {
            prompt_tokens: parsed.usage.input_tokens,
            cached_tokens: parsed.usage.cache_read_input_tokens,
            completion_tokens: parsed.usage.output_tokens,
        },
    ))
}
