//! The closed set of memory types and their lifecycle classes.

use serde::{Deserialize, Serialize};

/// Every fact the extractor produces is tagged with one of these types.
///
/// The tag drives dedup radius, contradiction radius, and aging rules.
/// Unrecognized tags round-trip through [`MemoryType::Unknown`] so a newer
/// extractor prompt cannot break an older store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryType {
    ProjectBrief,
    Architecture,
    TechContext,
    ProductContext,
    SessionSummary,
    Progress,
    ProjectConfig,
    ErrorSolution,
    Preference,
    LearnedPattern,
    Conversation,
    Unknown(String),
}

impl MemoryType {
    /// The canonical tag string stored in the table and in metadata.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProjectBrief => "project-brief",
            Self::Architecture => "architecture",
            Self::TechContext => "tech-context",
            Self::ProductContext => "product-context",
            Self::SessionSummary => "session-summary",
            Self::Progress => "progress",
            Self::ProjectConfig => "project-config",
            Self::ErrorSolution => "error-solution",
            Self::Preference => "preference",
            Self::LearnedPattern => "learned-pattern",
            Self::Conversation => "conversation",
            Self::Unknown(tag) => tag,
        }
    }

    /// Structural types describe slowly-evolving project facts and get a
    /// wider dedup and contradiction radius.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ProjectBrief
                | Self::Architecture
                | Self::TechContext
                | Self::ProductContext
                | Self::ProjectConfig
        )
    }

    /// Types with their own aging rules skip contradiction detection.
    pub fn skips_versioning(&self) -> bool {
        matches!(self, Self::SessionSummary | Self::Progress)
    }

    /// Cosine-distance threshold under which a new fact of this type is a
    /// duplicate of an existing one.
    pub fn dedup_threshold(&self) -> f32 {
        if self.is_structural() {
            crate::config::constants::DEDUP_THRESHOLD_STRUCTURAL
        } else {
            crate::config::constants::DEDUP_THRESHOLD
        }
    }

    /// Widened cosine-distance radius for contradiction candidates.
    pub fn contradiction_threshold(&self) -> f32 {
        if self.is_structural() {
            crate::config::constants::CONTRADICTION_THRESHOLD_STRUCTURAL
        } else {
            crate::config::constants::CONTRADICTION_THRESHOLD
        }
    }
}

impl From<&str> for MemoryType {
    fn from(tag: &str) -> Self {
        match tag {
            "project-brief" => Self::ProjectBrief,
            "architecture" => Self::Architecture,
            "tech-context" => Self::TechContext,
            "product-context" => Self::ProductContext,
            "session-summary" => Self::SessionSummary,
            "progress" => Self::Progress,
            "project-config" => Self::ProjectConfig,
            "error-solution" => Self::ErrorSolution,
            "preference" => Self::Preference,
            "learned-pattern" => Self::LearnedPattern,
            "conversation" => Self::Conversation,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for MemoryType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<MemoryType> for String {
    fn from(t: MemoryType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for MemoryType {
    fn default() -> Self {
        Self::LearnedPattern
    }
}
