//! # codexfi-embeddings
//!
//! HTTP embedding engine. One config-pinned model, fixed dimensionality,
//! role-aware requests (`document` for stored facts, `query` for
//! searches), network retry, best-effort cost telemetry.

mod engine;

pub use engine::EmbeddingEngine;
