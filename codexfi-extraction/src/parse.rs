//! Robust parsing of raw LLM output.
//!
//! Models wrap JSON in markdown fences, nest arrays inside objects, and
//! sometimes emit bare strings. Every shape either normalizes to typed
//! facts or collapses to an empty list; this module never errors.

use serde_json::Value;
use tracing::warn;

use codexfi_core::memory::{ExtractedFact, MemoryType};

/// Parse raw LLM output into typed facts.
pub fn parse_facts(raw: &str) -> Vec<ExtractedFact> {
    let cleaned = strip_fences(raw);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable extraction output");
            return Vec::new();
        }
    };
    facts_from_value(&value)
}

fn facts_from_value(value: &Value) -> Vec<ExtractedFact> {
    match value {
        Value::Array(items) => items.iter().filter_map(fact_from_item).collect(),
        // Models occasionally wrap output as {"memories": [...]}; recurse
        // into the first array-valued field.
        Value::Object(map) => map
            .values()
            .find(|v| v.is_array())
            .map(facts_from_value)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn fact_from_item(item: &Value) -> Option<ExtractedFact> {
    let (memory, memory_type) = match item {
        Value::String(s) => (s.clone(), MemoryType::LearnedPattern),
        Value::Object(map) => {
            let memory = map.get("memory").and_then(Value::as_str)?.to_string();
            let memory_type = map
                .get("type")
                .and_then(Value::as_str)
                .map(MemoryType::from)
                .unwrap_or_default();
            (memory, memory_type)
        }
        _ => return None,
    };

    let memory = memory.trim().to_string();
    if memory.is_empty() {
        return None;
    }
    Some(ExtractedFact {
        memory,
        memory_type,
    })
}

/// Parse a JSON array of ids (contradiction responses). Accepts bare
/// strings and `{"id": ...}` objects; everything else is dropped.
pub fn parse_id_array(raw: &str) -> Vec<String> {
    let cleaned = strip_fences(raw);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable id array");
            return Vec::new();
        }
    };
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Strip leading/trailing triple-backtick fences and a leading `json`
/// language marker.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_array_of_objects() {
        let facts = parse_facts(r#"[{"memory": "uses pnpm", "type": "tech-context"}]"#);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].memory, "uses pnpm");
        assert_eq!(facts[0].memory_type, MemoryType::TechContext);
    }

    #[test]
    fn fenced_output_with_language_marker() {
        let raw = "```json\n[{\"memory\": \"auth via JWT\", \"type\": \"architecture\"}]\n```";
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].memory_type, MemoryType::Architecture);
    }

    #[test]
    fn bare_strings_become_learned_patterns() {
        let facts = parse_facts(r#"["remember to run migrations", "tests live in tests/"]"#);
        assert_eq!(facts.len(), 2);
        assert!(facts
            .iter()
            .all(|f| f.memory_type == MemoryType::LearnedPattern));
    }

    #[test]
    fn wrapped_object_recurses_into_array_field() {
        let facts = parse_facts(r#"{"memories": [{"memory": "db is sqlite"}]}"#);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].memory, "db is sqlite");
        assert_eq!(facts[0].memory_type, MemoryType::LearnedPattern);
    }

    #[test]
    fn empty_and_whitespace_memories_are_dropped() {
        let facts =
            parse_facts(r#"[{"memory": ""}, {"memory": "   "}, {"memory": " keep me "}]"#);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].memory, "keep me");
    }

    #[test]
    fn missing_type_defaults() {
        let facts = parse_facts(r#"[{"memory": "x"}]"#);
        assert_eq!(facts[0].memory_type, MemoryType::LearnedPattern);
    }

    #[test]
    fn unknown_type_is_carried() {
        let facts = parse_facts(r#"[{"memory": "x", "type": "brand-new"}]"#);
        assert_eq!(
            facts[0].memory_type,
            MemoryType::Unknown("brand-new".to_string())
        );
    }

    #[test]
    fn garbage_yields_empty() {
        assert!(parse_facts("I could not find any facts.").is_empty());
        assert!(parse_facts("").is_empty());
        assert!(parse_facts("{\"no\": \"arrays here\"}").is_empty());
        assert!(parse_facts("42").is_empty());
    }

    #[test]
    fn sentinel_yields_empty() {
        assert!(parse_facts("[]").is_empty());
    }

    #[test]
    fn id_array_accepts_strings_and_objects() {
        let ids = parse_id_array(r#"["a", {"id": "b"}, 3, ""]"#);
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn id_array_garbage_yields_empty() {
        assert!(parse_id_array("none of these contradict").is_empty());
        assert!(parse_id_array(r#"{"ids": "not-an-array"}"#).is_empty());
    }
}
