//! # codexfi-engine
//!
//! The store engine. Owns every lifecycle invariant: one canonical entry
//! per semantic fact (dedup), newer claims supersede older ones
//! (contradiction detection), and type-specific aging keeps `progress`
//! singleton and session summaries bounded. Serves ranked retrieval that
//! blends semantic similarity, recency, and type-keyed enumeration.

mod engine;
mod score;
mod stack;

pub use engine::{IngestOptions, ListOptions, MemoryEngine, SearchOptions};
pub use stack::MemoryStack;
