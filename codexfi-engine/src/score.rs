//! Pure scoring functions for hybrid search.

use chrono::{DateTime, NaiveDate, Utc};

use codexfi_core::config::constants::RECENCY_DECAY_RATE;

/// Cosine distance → similarity, floored at zero.
pub fn semantic_score(distance: f32) -> f32 {
    (1.0 - distance).max(0.0)
}

/// Blend semantic similarity with recency. `w == 0` is pure semantic.
pub fn blend(semantic: f32, recency: f64, recency_weight: f64) -> f32 {
    if recency_weight <= 0.0 {
        return semantic;
    }
    ((1.0 - recency_weight) * semantic as f64 + recency_weight * recency) as f32
}

/// `exp(-rate * days_from_newest)`; the newest row scores 1.0.
pub fn recency_score(date: Option<NaiveDate>, newest: NaiveDate) -> f64 {
    match date {
        Some(d) => {
            let days = (newest - d).num_days().max(0) as f64;
            (-RECENCY_DECAY_RATE * days).exp()
        }
        None => 0.0,
    }
}

/// Resolve the date used for recency: metadata `date` when present, else
/// the date part of `created_at`. Returns the display string alongside
/// the parsed date; a malformed metadata date keeps its string but parses
/// to `None` and contributes zero recency.
pub fn resolve_date(
    metadata: &serde_json::Value,
    created_at: DateTime<Utc>,
) -> (String, Option<NaiveDate>) {
    if let Some(raw) = metadata.get("date").and_then(|v| v.as_str()) {
        return (raw.to_string(), parse_date(raw));
    }
    let date = created_at.date_naive();
    (date.to_string(), Some(date))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
