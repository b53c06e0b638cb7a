pub mod events;
pub mod record;
pub mod types;

pub use events::{
    ChatMessage, ContradictionCandidate, ExtractedFact, ExtractionMode, IngestEvent,
    IngestOutcome, ProfileEntry, SearchHit,
};
pub use record::MemoryRecord;
pub use types::MemoryType;
