//! Shared test fixtures: scripted embedder and extractor stubs, vector
//! helpers, and an engine factory over a temp-dir table.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use codexfi_core::errors::CodexfiResult;
use codexfi_core::memory::{ContradictionCandidate, ExtractedFact, ExtractionMode};
use codexfi_core::traits::{EmbedRole, Embedder, FactExtractor};
use codexfi_engine::MemoryEngine;
use codexfi_storage::MemoryTable;

pub const DIMS: usize = 128;

/// Deterministic embedder: scripted vectors win, otherwise a normalized
/// pseudo-random vector derived from the text. Distinct texts land nearly
/// orthogonal at 128 dims, so unscripted pairs never collide with the
/// dedup or contradiction radii.
pub struct StubEmbedder {
    dims: usize,
    scripted: Mutex<HashMap<String, Vec<f32>>>,
}

impl StubEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            scripted: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        assert_eq!(vector.len(), self.dims);
        self.scripted
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;
        let mut v: Vec<f32> = (0..self.dims)
            .map(|_| {
                // splitmix64 step
                state = state.wrapping_add(0x9e3779b97f4a7c15);
                let mut z = state;
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
                z ^= z >> 31;
                (z as f64 / u64::MAX as f64) as f32 - 0.5
            })
            .collect();
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str, _role: EmbedRole) -> CodexfiResult<Vec<f32>> {
        if let Some(v) = self.scripted.lock().unwrap().get(text) {
            return Ok(v.clone());
        }
        Ok(self.hash_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Scripted extractor. `extract` pops queued fact batches;
/// `detect_contradictions` pops queued id lists, or returns every
/// candidate when `contradict_all` is set; `condense` returns the
/// configured text.
#[derive(Default)]
pub struct StubExtractor {
    extractions: Mutex<VecDeque<Vec<ExtractedFact>>>,
    contradictions: Mutex<VecDeque<Vec<String>>>,
    condense_with: Mutex<Option<String>>,
    contradict_all: AtomicBool,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_extraction(&self, facts: Vec<ExtractedFact>) {
        self.extractions.lock().unwrap().push_back(facts);
    }

    pub fn push_contradictions(&self, ids: Vec<String>) {
        self.contradictions.lock().unwrap().push_back(ids);
    }

    pub fn set_condense(&self, text: Option<&str>) {
        *self.condense_with.lock().unwrap() = text.map(str::to_string);
    }

    /// Every candidate offered to the contradiction prompt is obsolete.
    pub fn contradict_everything(&self) {
        self.contradict_all.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FactExtractor for StubExtractor {
    async fn extract(&self, _transcript: &str, _mode: ExtractionMode) -> Vec<ExtractedFact> {
        self.extractions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }

    async fn detect_contradictions(
        &self,
        _new_memory: &str,
        candidates: &[ContradictionCandidate],
    ) -> Vec<String> {
        if let Some(ids) = self.contradictions.lock().unwrap().pop_front() {
            return ids;
        }
        if self.contradict_all.load(Ordering::SeqCst) {
            return candidates.iter().map(|c| c.id.clone()).collect();
        }
        Vec::new()
    }

    async fn condense(&self, summary: &str) -> Option<String> {
        self.condense_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|prefix| format!("{prefix}: {summary}"))
    }
}

pub struct TestHarness {
    pub engine: MemoryEngine,
    pub embedder: Arc<StubEmbedder>,
    pub extractor: Arc<StubExtractor>,
    // Held so the table directory outlives the engine.
    _dir: tempfile::TempDir,
}

pub async fn harness() -> TestHarness {
    let dir = tempfile::tempdir().unwrap();
    let table = MemoryTable::open_with_dims(dir.path(), DIMS).await.unwrap();
    let embedder = Arc::new(StubEmbedder::new(DIMS));
    let extractor = Arc::new(StubExtractor::new());
    let engine = MemoryEngine::new(table, embedder.clone(), extractor.clone());
    TestHarness {
        engine,
        embedder,
        extractor,
        _dir: dir,
    }
}

// --- Vector helpers ---

pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    v[axis] = 1.0;
    v
}

/// A unit vector at the given cosine to `a`, leaning along `b`.
/// `a` and `b` must be orthonormal.
pub fn at_cosine(a: &[f32], b: &[f32], cosine: f32) -> Vec<f32> {
    let sine = (1.0 - cosine * cosine).sqrt();
    let mut v: Vec<f32> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| cosine * x + sine * y)
        .collect();
    normalize(&mut v);
    v
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

pub fn fact(memory: &str, tag: &str) -> ExtractedFact {
    ExtractedFact {
        memory: memory.to_string(),
        memory_type: codexfi_core::memory::MemoryType::from(tag),
    }
}

pub fn messages(content: &str) -> Vec<codexfi_core::memory::ChatMessage> {
    vec![codexfi_core::memory::ChatMessage::new("user", content)]
}
