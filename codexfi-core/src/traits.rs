//! Trait seams between the engine and its collaborators.
//!
//! The engine only sees these traits; tests inject scripted stubs.

use async_trait::async_trait;

use crate::errors::CodexfiResult;
use crate::memory::{ContradictionCandidate, ExtractedFact, ExtractionMode};

/// Whether a text is embedded as stored content or as a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    Document,
    Query,
}

impl EmbedRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

/// Text → fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, role: EmbedRole) -> CodexfiResult<Vec<f32>>;

    fn dimensions(&self) -> usize;
}

/// LLM-backed fact extraction, contradiction judgement, and condensation.
///
/// Extraction never fails: provider exhaustion and parse failures both
/// yield an empty list so a broken LLM cannot block a user session.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Pull typed facts out of a transcript (mode picks the prompt family).
    async fn extract(&self, transcript: &str, mode: ExtractionMode) -> Vec<ExtractedFact>;

    /// Which of `candidates` does `new_memory` make obsolete? Returns a
    /// subset of candidate ids; empty on failure.
    async fn detect_contradictions(
        &self,
        new_memory: &str,
        candidates: &[ContradictionCandidate],
    ) -> Vec<String>;

    /// Compact a verbose session summary into one learned-pattern fact.
    /// `None` when the call or parse fails.
    async fn condense(&self, summary: &str) -> Option<String>;
}
