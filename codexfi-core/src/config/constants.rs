//! Central tuning constants: dimensions, thresholds, caps, model ids, pricing.

/// Embedding dimensionality, pinned by the embedding model.
pub const EMBEDDING_DIMS: usize = 1024;

/// Embedding model identifier.
pub const EMBEDDING_MODEL: &str = "voyage-3";

// --- Dedup (cosine distance; smaller = more similar) ---

/// Dedup threshold for non-structural types (~88% cosine similarity).
pub const DEDUP_THRESHOLD: f32 = 0.12;

/// Dedup threshold for structural types (~75% similarity). These facts
/// evolve slowly and should collapse aggressively.
pub const DEDUP_THRESHOLD_STRUCTURAL: f32 = 0.25;

// --- Contradiction detection ---

/// Widened candidate radius for non-structural types.
pub const CONTRADICTION_THRESHOLD: f32 = 0.5;

/// Widened candidate radius for structural types.
pub const CONTRADICTION_THRESHOLD_STRUCTURAL: f32 = 0.75;

/// Maximum candidate memories offered to the contradiction prompt.
pub const CONTRADICTION_CANDIDATE_LIMIT: usize = 25;

// --- Lifecycle caps ---

/// Source-transcript excerpt attached to each record.
pub const MAX_CHUNK_CHARS: usize = 8_000;

/// Rolling window of active session summaries per scope.
pub const SESSION_SUMMARY_WINDOW: usize = 3;

// --- Search ---

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Minimum blended score for a row to surface.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

/// Fixed score assigned to enumeration-union rows: below typical semantic
/// hits, above the noise floor.
pub const ENUMERATION_BASE_SCORE: f32 = 0.25;

/// Exponent rate for recency decay: `exp(-RATE * days_from_newest)`.
pub const RECENCY_DECAY_RATE: f64 = 0.1;

/// Default limit for `get_profile`.
pub const DEFAULT_PROFILE_LIMIT: usize = 100;

// --- Timeouts & telemetry ---

/// Abort timeout on each LLM provider request. The retry kernel must NOT
/// add a second timeout on top of this.
pub const LLM_TIMEOUT_SECS: u64 = 60;

/// Ring-buffer capacity of the activity log.
pub const ACTIVITY_LOG_CAP: usize = 200;

// --- Extraction model ids ---

pub const OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const GOOGLE_MODEL: &str = "gemini-2.0-flash";

// --- Pricing, USD per million tokens ---

pub const OPENAI_PRICE_PROMPT: f64 = 0.40;
pub const OPENAI_PRICE_CACHED: f64 = 0.10;
pub const OPENAI_PRICE_COMPLETION: f64 = 1.60;

pub const ANTHROPIC_PRICE_PROMPT: f64 = 0.80;
pub const ANTHROPIC_PRICE_CACHED: f64 = 0.08;
pub const ANTHROPIC_PRICE_COMPLETION: f64 = 4.00;

pub const GOOGLE_PRICE_PROMPT: f64 = 0.10;
pub const GOOGLE_PRICE_COMPLETION: f64 = 0.40;

pub const VOYAGE_PRICE_PER_MTOK: f64 = 0.06;

/// Cost of a call given token counts and per-million prices.
pub fn cost_usd(prompt: u64, cached: u64, completion: u64, prices: (f64, f64, f64)) -> f64 {
    let (p, c, o) = prices;
    (prompt as f64 * p + cached as f64 * c + completion as f64 * o) / 1_000_000.0
}
