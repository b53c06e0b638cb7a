//! # codexfi-extraction
//!
//! LLM-backed fact extraction. A prompt and a conversation go in; typed
//! facts come out. Providers are interchangeable behind `call(system,
//! user) → text`; the dispatcher walks them in deterministic order and
//! falls back on any non-fatal failure. Total exhaustion yields the `"[]"`
//! sentinel so extraction can never block a user session.

mod engine;
mod parse;
mod prompts;
mod providers;

pub use engine::ExtractionEngine;
pub use parse::{parse_facts, parse_id_array};
