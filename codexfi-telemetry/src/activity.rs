//! Bounded activity log: the last N provider calls, newest first on read.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use codexfi_core::config::constants::ACTIVITY_LOG_CAP;

use crate::ledger::Provider;

/// One provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
    pub model: String,
    /// What the call was for: `extraction`, `summary`, `contradiction`,
    /// `condense`, `embedding`.
    pub operation: String,
    pub prompt_tokens: u64,
    pub cached_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// Ring buffer of recent provider activity, persisted to `activity.json`.
/// Loss of history is non-fatal.
pub struct ActivityLog {
    path: PathBuf,
    state: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityLog {
    pub fn init(dir: &std::path::Path) -> Self {
        let log = Self {
            path: dir.join("activity.json"),
            state: Mutex::new(VecDeque::new()),
        };
        log.load();
        log
    }

    /// Append an entry, evicting the oldest past the cap, and persist.
    pub fn record(&self, entry: ActivityEntry) {
        {
            let mut state = self.state.lock().expect("activity lock");
            state.push_back(entry);
            while state.len() > ACTIVITY_LOG_CAP {
                state.pop_front();
            }
        }
        self.save();
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let state = self.state.lock().expect("activity lock");
        state.iter().rev().take(limit).cloned().collect()
    }

    /// Re-read from disk for cross-process reads.
    pub fn load(&self) {
        if let Ok(raw) = std::fs::read_to_string(&self.path) {
            match serde_json::from_str::<Vec<ActivityEntry>>(&raw) {
                Ok(entries) => {
                    *self.state.lock().expect("activity lock") = entries.into();
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "unreadable activity log")
                }
            }
        }
    }

    fn save(&self) {
        let entries: Vec<ActivityEntry> = {
            let state = self.state.lock().expect("activity lock");
            state.iter().cloned().collect()
        };
        match serde_json::to_string(&entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "activity log write failed");
                }
            }
            Err(e) => warn!(error = %e, "activity log serialize failed"),
        }
    }
}
