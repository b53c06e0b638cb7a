//! ExtractionEngine — ordered-fallback dispatch over the provider clients.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use codexfi_core::config::constants::{
    cost_usd, ANTHROPIC_MODEL, ANTHROPIC_PRICE_CACHED, ANTHROPIC_PRICE_COMPLETION,
    ANTHROPIC_PRICE_PROMPT, GOOGLE_MODEL, GOOGLE_PRICE_COMPLETION, GOOGLE_PRICE_PROMPT,
    OPENAI_MODEL, OPENAI_PRICE_CACHED, OPENAI_PRICE_COMPLETION, OPENAI_PRICE_PROMPT,
};
use codexfi_core::config::{Credentials, ExtractionProvider};
use codexfi_core::memory::{ContradictionCandidate, ExtractedFact, ExtractionMode, MemoryType};
use codexfi_core::retry::{with_retry, RetryConfig};
use codexfi_core::traits::FactExtractor;
use codexfi_telemetry::{ActivityEntry, ActivityLog, CallUsage, CostLedger, Provider};

use crate::parse::{parse_facts, parse_id_array};
use crate::prompts;
use crate::providers::{self, ProviderUsage};

/// Returned when every provider is exhausted: the downstream parser reads
/// it as zero facts, so extraction failure never blocks a session.
const EMPTY_SENTINEL: &str = "[]";

pub struct ExtractionEngine {
    http: reqwest::Client,
    credentials: Credentials,
    ledger: Arc<CostLedger>,
    activity: Arc<ActivityLog>,
}

impl ExtractionEngine {
    pub fn new(
        credentials: Credentials,
        ledger: Arc<CostLedger>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            ledger,
            activity,
        }
    }

    /// Configured primary first, the rest in declaration order, no
    /// duplicates.
    fn ordered_providers(&self) -> Vec<ExtractionProvider> {
        let primary = self.credentials.extraction_provider;
        let mut order = vec![primary];
        order.extend(
            ExtractionProvider::all()
                .into_iter()
                .filter(|p| *p != primary),
        );
        order
    }

    fn key_for(&self, provider: ExtractionProvider) -> &str {
        match provider {
            ExtractionProvider::Openai => &self.credentials.openai_api_key,
            ExtractionProvider::Anthropic => &self.credentials.anthropic_api_key,
            ExtractionProvider::Google => &self.credentials.gemini_api_key,
        }
    }

    /// Walk the provider order until one call succeeds. Each provider is
    /// retried under the no-timeout network profile — the 60s abort lives
    /// inside the provider call, and stacking a second timer on top would
    /// double-count it.
    async fn call_llm(&self, system: &str, user: &str, operation: &str) -> String {
        for provider in self.ordered_providers() {
            let key = self.key_for(provider);
            if key.is_empty() {
                debug!(provider = provider.as_str(), "no credentials, skipping");
                continue;
            }

            let label = format!("llm:{}", provider.as_str());
            let result = with_retry(&label, &RetryConfig::network_no_timeout(), || {
                providers::call(provider, &self.http, key, system, user)
            })
            .await;

            match result {
                Ok((text, usage)) => {
                    self.record_usage(provider, operation, &usage);
                    return text;
                }
                Err(e) => {
                    warn!(
                        provider = provider.as_str(),
                        operation,
                        error = %e,
                        "provider exhausted, falling back"
                    );
                }
            }
        }
        info!(operation, "all extraction providers exhausted");
        EMPTY_SENTINEL.to_string()
    }

    fn record_usage(&self, provider: ExtractionProvider, operation: &str, usage: &ProviderUsage) {
        let (telemetry_provider, model, usd) = match provider {
            ExtractionProvider::Openai => (
                Provider::Openai,
                OPENAI_MODEL,
                cost_usd(
                    usage.prompt_tokens.saturating_sub(usage.cached_tokens),
                    usage.cached_tokens,
                    usage.completion_tokens,
                    (OPENAI_PRICE_PROMPT, OPENAI_PRICE_CACHED, OPENAI_PRICE_COMPLETION),
                ),
            ),
            ExtractionProvider::Anthropic => (
                Provider::Anthropic,
                ANTHROPIC_MODEL,
                cost_usd(
                    usage.prompt_tokens,
                    usage.cached_tokens,
                    usage.completion_tokens,
                    (
                        ANTHROPIC_PRICE_PROMPT,
                        ANTHROPIC_PRICE_CACHED,
                        ANTHROPIC_PRICE_COMPLETION,
                    ),
                ),
            ),
            ExtractionProvider::Google => (
                Provider::Google,
                GOOGLE_MODEL,
                cost_usd(
                    usage.prompt_tokens,
                    0,
                    usage.completion_tokens,
                    (GOOGLE_PRICE_PROMPT, 0.0, GOOGLE_PRICE_COMPLETION),
                ),
            ),
        };

        self.ledger.record(
            telemetry_provider,
            CallUsage {
                prompt_tokens: usage.prompt_tokens,
                cached_tokens: usage.cached_tokens,
                completion_tokens: usage.completion_tokens,
                cost_usd: usd,
            },
        );
        self.activity.record(ActivityEntry {
            timestamp: chrono::Utc::now(),
            provider: telemetry_provider,
            model: model.to_string(),
            operation: operation.to_string(),
            prompt_tokens: usage.prompt_tokens,
            cached_tokens: usage.cached_tokens,
            completion_tokens: usage.completion_tokens,
            cost_usd: usd,
        });
    }
}

#[async_trait]
impl FactExtractor for ExtractionEngine {
    async fn extract(&self, transcript: &str, mode: ExtractionMode) -> Vec<ExtractedFact> {
        let (system, user, operation) = match mode {
            ExtractionMode::Normal => {
                let (s, u) = prompts::extraction(transcript);
                (s, u, "extraction")
            }
            ExtractionMode::Summary => {
                let (s, u) = prompts::summary(transcript);
                (s, u, "summary")
            }
            ExtractionMode::Init => {
                let (s, u) = prompts::init_extraction(transcript);
                (s, u, "extraction")
            }
        };

        let raw = self.call_llm(&system, &user, operation).await;
        let mut facts = parse_facts(&raw);

        // Summary mode yields exactly one session-summary fact regardless
        // of how the model tagged it.
        if mode == ExtractionMode::Summary {
            facts.truncate(1);
            for fact in &mut facts {
                fact.memory_type = MemoryType::SessionSummary;
            }
        }

        debug!(count = facts.len(), ?mode, "extraction produced facts");
        facts
    }

    async fn detect_contradictions(
        &self,
        new_memory: &str,
        candidates: &[ContradictionCandidate],
    ) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let (system, user) = prompts::contradiction(new_memory, candidates);
        let raw = self.call_llm(&system, &user, "contradiction").await;
        let ids = parse_id_array(&raw);

        // Only ids the prompt was actually offered count.
        ids.into_iter()
            .filter(|id| candidates.iter().any(|c| &c.id == id))
            .collect()
    }

    async fn condense(&self, summary: &str) -> Option<String> {
        let (system, user) = prompts::condense(summary);
        let raw = self.call_llm(&system, &user, "condense").await;
        parse_facts(&raw).into_iter().next().map(|f| f.memory)
    }
}
