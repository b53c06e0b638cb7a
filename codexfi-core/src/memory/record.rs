//! The persisted memory record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::MemoryType;

/// The only persisted entity. One row in the vector table.
///
/// A record is *active* while `superseded_by` is `None`; once a newer
/// record replaces it the field points at the successor and the record
/// disappears from every active query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v4, immutable after creation.
    pub id: String,
    /// The canonical fact text. Non-empty after trim.
    pub memory: String,
    /// Owning scope tag. Must pass `validate_id`.
    pub user_id: String,
    /// Embedding of `memory`; length == `EMBEDDING_DIMS`.
    pub vector: Vec<f32>,
    /// Free-form metadata object; carries at least `{"type": ...}` when typed.
    pub metadata: serde_json::Value,
    /// Duplicated from metadata so filters can run on a scalar column.
    pub memory_type: MemoryType,
    /// Set on insert, never mutated.
    pub created_at: DateTime<Utc>,
    /// Refreshed on dedup-merge and supersede.
    pub updated_at: DateTime<Utc>,
    /// blake3 hex digest of `memory`.
    pub hash: String,
    /// Truncated source transcript, kept for detail queries.
    pub chunk: String,
    /// Id of the record that replaced this one; `None` means active.
    pub superseded_by: Option<String>,
}

impl MemoryRecord {
    /// Build a fresh record with a new UUID and both timestamps set to now.
    pub fn new(
        memory: impl Into<String>,
        user_id: impl Into<String>,
        vector: Vec<f32>,
        metadata: serde_json::Value,
        memory_type: MemoryType,
        chunk: impl Into<String>,
    ) -> Self {
        let memory = memory.into();
        let now = Utc::now();
        let hash = Self::content_hash(&memory);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            memory,
            user_id: user_id.into(),
            vector,
            metadata,
            memory_type,
            created_at: now,
            updated_at: now,
            hash,
            chunk: chunk.into(),
            superseded_by: None,
        }
    }

    /// blake3 hex digest of the fact text.
    pub fn content_hash(memory: &str) -> String {
        blake3::hash(memory.as_bytes()).to_hex().to_string()
    }

    /// Whether this record is the canonical current fact.
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

impl PartialEq for MemoryRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
