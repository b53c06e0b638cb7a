//! Startup wiring: build the full engine stack over a data directory.

use std::path::Path;
use std::sync::Arc;

use codexfi_core::config::{data_dir, Credentials};
use codexfi_core::errors::CodexfiResult;
use codexfi_embeddings::EmbeddingEngine;
use codexfi_extraction::ExtractionEngine;
use codexfi_storage::MemoryTable;
use codexfi_telemetry::{ActivityLog, CostLedger, NameRegistry};

use crate::engine::MemoryEngine;

/// Everything a host process needs, constructed once at startup and
/// passed explicitly. The telemetry handles are shared with the engine's
/// embedder and extractor; hosts read them for dashboards.
pub struct MemoryStack {
    pub engine: MemoryEngine,
    pub ledger: Arc<CostLedger>,
    pub activity: Arc<ActivityLog>,
    pub names: Arc<NameRegistry>,
}

impl MemoryStack {
    /// Open under an explicit data directory. Layout:
    /// `lancedb/` (vector table), `costs.json`, `activity.json`,
    /// `names.json`, optional `config.json` (credentials).
    pub async fn open(dir: &Path) -> CodexfiResult<Self> {
        std::fs::create_dir_all(dir)?;
        let credentials = Credentials::resolve(dir);

        let ledger = Arc::new(CostLedger::init(dir));
        let activity = Arc::new(ActivityLog::init(dir));
        let names = Arc::new(NameRegistry::init(dir));

        let embedder = Arc::new(EmbeddingEngine::new(
            credentials.voyage_api_key.clone(),
            ledger.clone(),
            activity.clone(),
        ));
        let extractor = Arc::new(ExtractionEngine::new(
            credentials,
            ledger.clone(),
            activity.clone(),
        ));

        let table = MemoryTable::open(&dir.join("lancedb")).await?;
        let engine = MemoryEngine::new(table, embedder, extractor);

        Ok(Self {
            engine,
            ledger,
            activity,
            names,
        })
    }

    /// Open under `$CODEXFI_DATA_DIR`, defaulting to `~/.codexfi`.
    pub async fn open_default() -> CodexfiResult<Self> {
        Self::open(&data_dir()).await
    }
}
