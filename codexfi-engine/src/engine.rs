//! MemoryEngine — orchestrates extract → embed → dedup → write → age →
//! supersede, and serves ranked retrieval.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use codexfi_core::config::constants::{
    CONTRADICTION_CANDIDATE_LIMIT, DEFAULT_PROFILE_LIMIT, DEFAULT_SCORE_THRESHOLD,
    DEFAULT_SEARCH_LIMIT, ENUMERATION_BASE_SCORE, MAX_CHUNK_CHARS, SESSION_SUMMARY_WINDOW,
};
use codexfi_core::config::validate_id;
use codexfi_core::errors::CodexfiResult;
use codexfi_core::memory::{
    ChatMessage, ContradictionCandidate, ExtractedFact, ExtractionMode, IngestEvent,
    IngestOutcome, MemoryRecord, MemoryType, ProfileEntry, SearchHit,
};
use codexfi_core::retry::{with_retry, RetryConfig};
use codexfi_core::traits::{EmbedRole, Embedder, FactExtractor};
use codexfi_storage::MemoryTable;

use crate::score;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub mode: ExtractionMode,
    /// Baseline metadata merged under each fact's `{type}`.
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    /// Minimum blended score for a row to surface.
    pub threshold: f32,
    /// 0.0 = pure semantic; higher mixes in recency.
    pub recency_weight: f64,
    /// Types to enumerate into the results at the base score.
    pub types: Option<Vec<MemoryType>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            threshold: DEFAULT_SCORE_THRESHOLD,
            recency_weight: 0.0,
            types: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<usize>,
    pub include_superseded: bool,
}

/// The store engine. Owns all lifecycle invariants.
pub struct MemoryEngine {
    table: MemoryTable,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn FactExtractor>,
}

impl MemoryEngine {
    pub fn new(
        table: MemoryTable,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn FactExtractor>,
    ) -> Self {
        Self {
            table,
            embedder,
            extractor,
        }
    }

    /// Direct access to the underlying table (dashboard refresh, tests).
    pub fn table(&self) -> &MemoryTable {
        &self.table
    }

    /// Re-open the table handle to observe writes from other processes.
    pub async fn refresh(&self) -> CodexfiResult<()> {
        self.table.refresh().await
    }

    // --- Ingest ---

    /// Extract facts from a message batch and run each through the full
    /// pipeline. A failed fact is logged and skipped; the batch proceeds.
    pub async fn ingest(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
        options: IngestOptions,
    ) -> CodexfiResult<Vec<IngestOutcome>> {
        let user_id = validate_id(user_id, "user_id")?;

        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let chunk: String = transcript.chars().take(MAX_CHUNK_CHARS).collect();

        let facts = self.extractor.extract(&transcript, options.mode).await;
        info!(
            facts = facts.len(),
            user_id = %user_id,
            mode = ?options.mode,
            "extraction complete"
        );

        let baseline = options.metadata.unwrap_or_else(|| Value::Object(Default::default()));
        let mut outcomes = Vec::with_capacity(facts.len());
        for fact in facts {
            match self.ingest_fact(fact, &user_id, &chunk, &baseline).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "fact skipped"),
            }
        }
        Ok(outcomes)
    }

    /// The per-fact pipeline. Boxed because session-summary aging ingests
    /// the condensed fact recursively.
    fn ingest_fact<'a>(
        &'a self,
        fact: ExtractedFact,
        user_id: &'a str,
        chunk: &'a str,
        baseline: &'a Value,
    ) -> BoxFuture<'a, CodexfiResult<IngestOutcome>> {
        Box::pin(async move {
            let mut metadata = baseline.clone();
            if !metadata.is_object() {
                metadata = Value::Object(Default::default());
            }
            metadata["type"] = Value::String(fact.memory_type.as_str().to_string());

            let vector = self.embedder.embed(&fact.memory, EmbedRole::Document).await?;

            // Dedup: nearest active record in scope, threshold by type.
            let scope = active_scope_filter(user_id);
            let nearest = with_retry("dedup-search", &RetryConfig::search(), || {
                self.table.vector_search(&vector, Some(&scope), 1)
            })
            .await?;

            if let Some((existing, distance)) = nearest.first() {
                if *distance <= fact.memory_type.dedup_threshold() {
                    return self.merge_duplicate(existing, &fact, &metadata, chunk).await;
                }
            }

            let record = MemoryRecord::new(
                fact.memory.clone(),
                user_id,
                vector,
                metadata,
                fact.memory_type.clone(),
                chunk,
            );
            with_retry("insert", &RetryConfig::write(), || {
                self.table.add(std::slice::from_ref(&record))
            })
            .await?;
            debug!(id = %record.id, memory_type = %record.memory_type, "record inserted");

            // Aging and contradiction run after the insert; their failures
            // leave the new fact in place.
            if let Err(e) = self.apply_aging(&record).await {
                warn!(id = %record.id, error = %e, "aging failed");
            }
            if !record.memory_type.skips_versioning() {
                if let Err(e) = self.detect_and_supersede(&record).await {
                    warn!(id = %record.id, error = %e, "contradiction detection failed");
                }
            }

            Ok(IngestOutcome {
                id: record.id,
                memory: record.memory,
                event: IngestEvent::Add,
            })
        })
    }

    /// Refresh a near-duplicate in place. The id, `created_at`, and the
    /// stored vector stay as they are — the vector is kept for stability
    /// under rename-like refreshes, so it can drift from the text over
    /// repeated merges.
    async fn merge_duplicate(
        &self,
        existing: &MemoryRecord,
        fact: &ExtractedFact,
        metadata: &Value,
        chunk: &str,
    ) -> CodexfiResult<IngestOutcome> {
        let id = validate_id(&existing.id, "id")?;
        let predicate = format!("id = '{id}'");
        let metadata_json = metadata.to_string();
        let hash = MemoryRecord::content_hash(&fact.memory);
        let updated_at = now_rfc3339();
        let sets = [
            ("memory", fact.memory.as_str()),
            ("metadata_json", metadata_json.as_str()),
            ("chunk", chunk),
            ("hash", hash.as_str()),
            ("updated_at", updated_at.as_str()),
        ];

        with_retry("dedup-update", &RetryConfig::write(), || {
            self.table.update_where(&predicate, &sets)
        })
        .await?;

        debug!(id = %existing.id, "duplicate merged");
        Ok(IngestOutcome {
            id: existing.id.clone(),
            memory: fact.memory.clone(),
            event: IngestEvent::Update,
        })
    }

    // --- Aging ---

    async fn apply_aging(&self, record: &MemoryRecord) -> CodexfiResult<()> {
        match record.memory_type {
            MemoryType::Progress => self.age_progress(record).await,
            MemoryType::SessionSummary => self.age_session_summaries(record).await,
            _ => Ok(()),
        }
    }

    /// Only the latest progress record survives. Physical delete.
    async fn age_progress(&self, record: &MemoryRecord) -> CodexfiResult<()> {
        let user_id = validate_id(&record.user_id, "user_id")?;
        let id = validate_id(&record.id, "id")?;
        let predicate = format!(
            "user_id = '{user_id}' AND memory_type = 'progress' AND superseded_by = '' AND id != '{id}'"
        );
        with_retry("progress-aging", &RetryConfig::write(), || {
            self.table.delete(&predicate)
        })
        .await?;
        debug!(keep = %record.id, "older progress records deleted");
        Ok(())
    }

    /// Keep at most `SESSION_SUMMARY_WINDOW` active summaries per scope.
    /// The oldest is condensed into a learned-pattern fact (full pipeline)
    /// and then deleted — deleted even when condensation fails, because
    /// unbounded growth is worse than a lost summary.
    async fn age_session_summaries(&self, record: &MemoryRecord) -> CodexfiResult<()> {
        let user_id = validate_id(&record.user_id, "user_id")?;
        let predicate = format!(
            "user_id = '{user_id}' AND memory_type = 'session-summary' AND superseded_by = ''"
        );
        let mut summaries = self.table.scan(Some(&predicate), None).await?;
        if summaries.len() <= SESSION_SUMMARY_WINDOW {
            return Ok(());
        }

        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let oldest = summaries.remove(0);

        match self.extractor.condense(&oldest.memory).await {
            Some(condensed) => {
                let fact = ExtractedFact {
                    memory: condensed,
                    memory_type: MemoryType::LearnedPattern,
                };
                let baseline = Value::Object(Default::default());
                if let Err(e) = self
                    .ingest_fact(fact, &record.user_id, &oldest.chunk, &baseline)
                    .await
                {
                    warn!(id = %oldest.id, error = %e, "condensed fact ingest failed");
                }
            }
            None => warn!(id = %oldest.id, "condensation failed, dropping summary"),
        }

        with_retry("summary-aging", &RetryConfig::write(), || {
            self.table.delete_by_id(&oldest.id)
        })
        .await?;
        info!(id = %oldest.id, "oldest session summary retired");
        Ok(())
    }

    // --- Contradiction ---

    /// Ask the LLM which semantically adjacent records the new one makes
    /// obsolete, and mark those superseded. Distance alone cannot tell
    /// agreement from contradiction.
    async fn detect_and_supersede(&self, record: &MemoryRecord) -> CodexfiResult<()> {
        let user_id = validate_id(&record.user_id, "user_id")?;
        let id = validate_id(&record.id, "id")?;
        let predicate = format!(
            "user_id = '{user_id}' AND superseded_by = '' AND id != '{id}'"
        );

        let threshold = record.memory_type.contradiction_threshold();
        let hits = with_retry("contradiction-search", &RetryConfig::search(), || {
            self.table
                .vector_search(&record.vector, Some(&predicate), CONTRADICTION_CANDIDATE_LIMIT)
        })
        .await?;

        let candidates: Vec<ContradictionCandidate> = hits
            .iter()
            .filter(|(_, distance)| *distance <= threshold)
            .map(|(r, _)| ContradictionCandidate {
                id: r.id.clone(),
                memory: r.memory.clone(),
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let obsolete = self
            .extractor
            .detect_contradictions(&record.memory, &candidates)
            .await;
        for old_id in obsolete {
            if old_id == record.id {
                continue;
            }
            let old_id = validate_id(&old_id, "id")?;
            with_retry("supersede", &RetryConfig::write(), || {
                self.table.mark_superseded(&old_id, &record.id)
            })
            .await?;
            info!(old = %old_id, new = %record.id, "record superseded");
        }
        Ok(())
    }

    // --- Search ---

    /// Embed the query and search. Results sorted by score descending.
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        options: SearchOptions,
    ) -> CodexfiResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(query, EmbedRole::Query).await?;
        self.search_by_vector(&vector, user_id, options).await
    }

    /// Search with a precomputed query vector (the dashboard reuses one
    /// embed across scopes).
    pub async fn search_by_vector(
        &self,
        vector: &[f32],
        user_id: &str,
        options: SearchOptions,
    ) -> CodexfiResult<Vec<SearchHit>> {
        let user_id = validate_id(user_id, "user_id")?;
        let scope = active_scope_filter(&user_id);

        let rows = with_retry("search", &RetryConfig::search(), || {
            self.table.vector_search(vector, Some(&scope), options.limit)
        })
        .await?;

        let dated: Vec<_> = rows
            .iter()
            .map(|(r, distance)| {
                let (display, parsed) = score::resolve_date(&r.metadata, r.created_at);
                (r, *distance, display, parsed)
            })
            .collect();

        let newest = dated.iter().filter_map(|(_, _, _, d)| *d).max();

        let mut hits: Vec<SearchHit> = dated
            .into_iter()
            .filter_map(|(r, distance, display, parsed)| {
                let semantic = score::semantic_score(distance);
                let blended = match newest {
                    Some(newest) if options.recency_weight > 0.0 => score::blend(
                        semantic,
                        score::recency_score(parsed, newest),
                        options.recency_weight,
                    ),
                    _ => semantic,
                };
                if blended < options.threshold {
                    return None;
                }
                Some(SearchHit {
                    id: r.id.clone(),
                    memory: r.memory.clone(),
                    chunk: r.chunk.clone(),
                    score: blended,
                    metadata: r.metadata.clone(),
                    created_at: r.created_at,
                    date: display,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(types) = &options.types {
            self.merge_enumeration(&mut hits, &user_id, types, options.limit)
                .await?;
        }
        hits.truncate(options.limit);
        Ok(hits)
    }

    /// Fold type-filtered rows into the hits at the fixed base score so
    /// "list all X" queries surface every X even with low similarity.
    async fn merge_enumeration(
        &self,
        hits: &mut Vec<SearchHit>,
        user_id: &str,
        types: &[MemoryType],
        limit: usize,
    ) -> CodexfiResult<()> {
        let enumerated = self
            .list_by_type(user_id, types, Some(limit))
            .await?;

        for record in enumerated {
            if hits.iter().any(|h| h.id == record.id) {
                continue;
            }
            let (display, _) = score::resolve_date(&record.metadata, record.created_at);
            hits.push(SearchHit {
                id: record.id,
                memory: record.memory,
                chunk: record.chunk,
                score: ENUMERATION_BASE_SCORE,
                metadata: record.metadata,
                created_at: record.created_at,
                date: display,
            });
        }
        // Stable sort keeps enumerated rows in created_at order among
        // themselves.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(())
    }

    // --- Listing & deletion ---

    /// Scope listing, `updated_at` descending.
    pub async fn list(
        &self,
        user_id: &str,
        options: ListOptions,
    ) -> CodexfiResult<Vec<MemoryRecord>> {
        let user_id = validate_id(user_id, "user_id")?;
        let predicate = if options.include_superseded {
            format!("user_id = '{user_id}'")
        } else {
            active_scope_filter(&user_id)
        };

        let mut rows = self.table.scan(Some(&predicate), None).await?;
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = options.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Active records of the given types, `created_at` ascending.
    pub async fn list_by_type(
        &self,
        user_id: &str,
        types: &[MemoryType],
        limit: Option<usize>,
    ) -> CodexfiResult<Vec<MemoryRecord>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let user_id = validate_id(user_id, "user_id")?;
        let tags = types
            .iter()
            .map(|t| validate_id(t.as_str(), "type").map(|t| format!("'{t}'")))
            .collect::<CodexfiResult<Vec<_>>>()?
            .join(", ");
        let predicate = format!(
            "user_id = '{user_id}' AND superseded_by = '' AND memory_type IN ({tags})"
        );

        let mut rows = self.table.scan(Some(&predicate), None).await?;
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Physical delete; a missing id succeeds.
    pub async fn delete(&self, id: &str) -> CodexfiResult<()> {
        let id = validate_id(id, "id")?;
        with_retry("delete", &RetryConfig::write(), || {
            self.table.delete_by_id(&id)
        })
        .await
    }

    /// Scope projection for profile display.
    pub async fn get_profile(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> CodexfiResult<Vec<ProfileEntry>> {
        let rows = self
            .list(
                user_id,
                ListOptions {
                    limit: Some(limit.unwrap_or(DEFAULT_PROFILE_LIMIT)),
                    include_superseded: false,
                },
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ProfileEntry {
                id: r.id,
                memory: r.memory,
                metadata: r.metadata,
                created_at: r.created_at,
            })
            .collect())
    }

    /// Active record count in scope.
    pub async fn count(&self, user_id: &str) -> CodexfiResult<usize> {
        let user_id = validate_id(user_id, "user_id")?;
        self.table
            .count_rows(Some(&active_scope_filter(&user_id)))
            .await
    }
}

fn active_scope_filter(user_id: &str) -> String {
    format!("user_id = '{user_id}' AND superseded_by = ''")
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
