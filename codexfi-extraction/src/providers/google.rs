//! Google generateContent client.

use std::time::Duration;

use serde::Deserialize;

use codexfi_core::config::constants::{GOOGLE_MODEL, LLM_TIMEOUT_SECS};
use codexfi_core::errors::{CodexfiResult, ExtractionError};

use super::ProviderUsage;

const BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage: UsageMetadata,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

pub async fn call(
    http: &reqwest::Client,
    api_key: &str,
    system: &str,
    user: &str,
) -> CodexfiResult<(String, ProviderUsage)> {
    let body = serde_json::json!({
        "system_instruction": {"parts": [{"text": system}]},
        "contents": [{"role": "user", "parts": [{"text": user}]}],
    });

    let url = format!("{BASE}/{GOOGLE_MODEL}:generateContent");
    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
        .json(&body)
        .send()
        .await
        .map_err(|e| ExtractionError::ProviderFailed {
            provider: "google".to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(super::status_error("google", status).into());
    }

    let parsed: GenerateResponse =
        response
            .json()
            .await
            .map_err(|e| ExtractionError::BadResponse {
                provider: "google".to_string(),
                reason: e.to_string(),
            })?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| ExtractionError::BadResponse {
            provider: "google".to_string(),
            reason: "no candidates".to_string(),
        })?;

    Ok((
        text,
        ProviderUsage {
            prompt_tokens: parsed.usage.prompt_token_count,
            cached_tokens: 0,
            completion_tokens: parsed.usage.candidates_token_count,
        },
    ))
}
