//! Persistent cumulative cost ledger.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which API the tokens were spent against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
    Google,
    Voyage,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Voyage => "voyage",
        }
    }
}

/// Token and cost breakdown of a single call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallUsage {
    pub prompt_tokens: u64,
    /// Prompt-cache reads, for providers that report them. Zero otherwise.
    pub cached_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// Cumulative totals for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderTotals {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub cached_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl ProviderTotals {
    fn apply(&mut self, usage: &CallUsage) {
        self.calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.cached_tokens += usage.cached_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.cost_usd += usage.cost_usd;
    }
}

/// The persisted shape of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub openai: ProviderTotals,
    pub anthropic: ProviderTotals,
    pub google: ProviderTotals,
    pub voyage: ProviderTotals,
    pub total_cost_usd: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LedgerSnapshot {
    fn totals_mut(&mut self, provider: Provider) -> &mut ProviderTotals {
        match provider {
            Provider::Openai => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::Google => &mut self.google,
            Provider::Voyage => &mut self.voyage,
        }
    }
}

/// Cumulative per-provider spend, persisted to `costs.json` after every
/// record. Concurrent writers may clobber each other; this is
/// observability data and last-writer-wins is acceptable.
pub struct CostLedger {
    path: PathBuf,
    state: Mutex<LedgerSnapshot>,
}

impl CostLedger {
    /// Open the ledger under `dir`, loading any existing snapshot.
    pub fn init(dir: &std::path::Path) -> Self {
        let ledger = Self {
            path: dir.join("costs.json"),
            state: Mutex::new(LedgerSnapshot::default()),
        };
        ledger.load();
        ledger
    }

    /// Add one call's usage and persist.
    pub fn record(&self, provider: Provider, usage: CallUsage) {
        {
            let mut state = self.state.lock().expect("ledger lock");
            state.totals_mut(provider).apply(&usage);
            state.total_cost_usd += usage.cost_usd;
            state.updated_at = Some(Utc::now());
        }
        self.save();
    }

    /// Deep copy of the current totals.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().expect("ledger lock").clone()
    }

    /// Zero everything and persist.
    pub fn reset(&self) {
        *self.state.lock().expect("ledger lock") = LedgerSnapshot::default();
        self.save();
    }

    /// Re-read the snapshot from disk, replacing in-memory state. Readers
    /// in another process call this before every read.
    pub fn load(&self) {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(snapshot) => *self.state.lock().expect("ledger lock") = snapshot,
                Err(e) => warn!(path = %self.path.display(), error = %e, "unreadable cost ledger"),
            },
            Err(_) => {}
        }
    }

    /// Persist the snapshot. Failure is logged and swallowed.
    pub fn save(&self) {
        let snapshot = self.snapshot();
        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "cost ledger serialize failed");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "cost ledger write failed");
        }
    }
}
