//! EmbeddingEngine — the single entry point for text → vector.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use codexfi_core::config::constants::{EMBEDDING_DIMS, EMBEDDING_MODEL, VOYAGE_PRICE_PER_MTOK};
use codexfi_core::errors::{CodexfiResult, EmbeddingError};
use codexfi_core::retry::{with_retry, RetryConfig};
use codexfi_core::traits::{EmbedRole, Embedder};
use codexfi_telemetry::{ActivityEntry, ActivityLog, CallUsage, CostLedger, Provider};

const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
    usage: UsageBlock,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct UsageBlock {
    #[serde(default)]
    total_tokens: u64,
}

/// Remote embedder pinned to one model and dimensionality.
pub struct EmbeddingEngine {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    ledger: Arc<CostLedger>,
    activity: Arc<ActivityLog>,
}

impl EmbeddingEngine {
    pub fn new(api_key: String, ledger: Arc<CostLedger>, activity: Arc<ActivityLog>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: EMBEDDING_MODEL.to_string(),
            dims: EMBEDDING_DIMS,
            ledger,
            activity,
        }
    }

    /// Point at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call_once(&self, text: &str, role: EmbedRole) -> CodexfiResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "input_type": role.as_str(),
        });

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(EmbeddingError::RequestFailed {
                reason: format!("http {status}"),
            }
            .into());
        }
        if !status.is_success() {
            return Err(EmbeddingError::BadResponse {
                reason: format!("http {status}"),
            }
            .into());
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::BadResponse {
                    reason: e.to_string(),
                })?;

        let row = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::BadResponse {
                reason: "empty data array".to_string(),
            })?;

        if row.embedding.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                actual: row.embedding.len(),
            }
            .into());
        }

        self.record_usage(parsed.usage.total_tokens);
        debug!(tokens = parsed.usage.total_tokens, role = role.as_str(), "embedded text");
        Ok(row.embedding)
    }

    /// Telemetry is best-effort; the ledger and activity log swallow their
    /// own write failures.
    fn record_usage(&self, tokens: u64) {
        let cost_usd = tokens as f64 * VOYAGE_PRICE_PER_MTOK / 1_000_000.0;
        self.ledger.record(
            Provider::Voyage,
            CallUsage {
                prompt_tokens: tokens,
                cached_tokens: 0,
                completion_tokens: 0,
                cost_usd,
            },
        );
        self.activity.record(ActivityEntry {
            timestamp: chrono::Utc::now(),
            provider: Provider::Voyage,
            model: self.model.clone(),
            operation: "embedding".to_string(),
            prompt_tokens: tokens,
            cached_tokens: 0,
            completion_tokens: 0,
            cost_usd,
        });
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed(&self, text: &str, role: EmbedRole) -> CodexfiResult<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::MissingCredentials {
                provider: "voyage".to_string(),
            }
            .into());
        }
        with_retry("embed", &RetryConfig::network(), || {
            self.call_once(text, role)
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
