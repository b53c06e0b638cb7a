//! OpenAI chat-completions client.

use std::time::Duration;

use serde::Deserialize;

use codexfi_core::config::constants::{LLM_TIMEOUT_SECS, OPENAI_MODEL};
use codexfi_core::errors::{CodexfiResult, ExtractionError};

use super::ProviderUsage;

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: PromptTokensDetails,
}

#[derive(Debug, Default, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

pub async fn call(
    http: &reqwest::Client,
    api_key: &str,
    system: &str,
    user: &str,
) -> CodexfiResult<(String, ProviderUsage)> {
    let body = serde_json::json!({
        "model": OPENAI_MODEL,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ],
    });

    let response = http
        .post(ENDPOINT)
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
        .json(&body)
        .send()
        .await
        .map_err(|e| ExtractionError::ProviderFailed {
            provider: "openai".to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(super::status_error("openai", status).into());
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| ExtractionError::BadResponse {
            provider: "openai".to_string(),
            reason: e.to_string(),
        })?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ExtractionError::BadResponse {
            provider: "openai".to_string(),
            reason: "no choices".to_string(),
        })?;

    Ok((
        text,
        ProviderUsage {
            prompt_tokens: parsed.usage.prompt_tokens,
            cached_tokens: parsed.usage.prompt_tokens_details.cached_tokens,
            completion_tokens: parsed.usage.completion_tokens,
        },
    ))
}
