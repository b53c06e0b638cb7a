//! DTOs crossing the engine boundary: ingest input/output and search hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::MemoryType;

/// One turn of the conversation handed to `ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Which prompt family the extractor dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Turn transcript → many typed facts.
    #[default]
    Normal,
    /// Message window → exactly one session summary.
    Summary,
    /// Concatenated project files → typed facts.
    Init,
}

/// A typed fact produced by the extractor, before embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub memory: String,
    #[serde(rename = "type", default)]
    pub memory_type: MemoryType,
}

/// What happened to a single fact during ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngestEvent {
    /// A new record was inserted.
    Add,
    /// An existing near-duplicate was refreshed in place.
    Update,
}

/// Per-fact ingest result surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub id: String,
    pub memory: String,
    pub event: IngestEvent,
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub memory: String,
    pub chunk: String,
    pub score: f32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// The date used for recency blending (metadata `date` or `created_at`).
    pub date: String,
}

/// An old memory offered to the contradiction prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionCandidate {
    pub id: String,
    pub memory: String,
}

/// Projection returned by `get_profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub id: String,
    pub memory: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
