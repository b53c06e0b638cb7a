//! The `memories` table handle.

use std::path::Path;

use arrow_array::{RecordBatch, RecordBatchIterator, RecordBatchReader};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::sync::RwLock;
use tracing::{debug, info};

use codexfi_core::config::constants::EMBEDDING_DIMS;
use codexfi_core::config::validate_id;
use codexfi_core::errors::{CodexfiResult, StorageError};
use codexfi_core::memory::{MemoryRecord, MemoryType};

use crate::schema::{
    batch_to_records, quote_literal, records_to_batch, table_schema, to_rfc3339, TABLE_NAME,
};

/// Handle onto the embedded vector table.
///
/// The handle snapshots the table version it was opened at; writes from
/// another process stay invisible until [`MemoryTable::refresh`] re-opens
/// the handle. Readers that must see the latest state (dashboard handlers,
/// test harnesses) refresh before every read.
pub struct MemoryTable {
    conn: Connection,
    table: RwLock<Table>,
    dims: usize,
}

impl MemoryTable {
    /// Open (or create) the table under `dir` with the production
    /// embedding dimensionality.
    pub async fn open(dir: &Path) -> CodexfiResult<Self> {
        Self::open_with_dims(dir, EMBEDDING_DIMS).await
    }

    /// Open with an explicit dimensionality. Tests use small vectors.
    pub async fn open_with_dims(dir: &Path, dims: usize) -> CodexfiResult<Self> {
        std::fs::create_dir_all(dir)?;
        let uri = dir.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| StorageError::OpenFailed {
                path: uri.clone(),
                reason: e.to_string(),
            })?;

        let table = match conn.open_table(TABLE_NAME).execute().await {
            Ok(t) => t,
            Err(lancedb::Error::TableNotFound { .. }) => {
                Self::create_table(&conn, &uri, dims).await?
            }
            Err(e) => {
                return Err(StorageError::OpenFailed {
                    path: uri,
                    reason: e.to_string(),
                }
                .into())
            }
        };

        debug!(path = %uri, dims, "memory table opened");
        Ok(Self {
            conn,
            table: RwLock::new(table),
            dims,
        })
    }

    /// Create the table from a single seed row, then delete the seed.
    /// Writing a real row pins the vector column to `dims` for the life of
    /// the table.
    async fn create_table(conn: &Connection, uri: &str, dims: usize) -> CodexfiResult<Table> {
        let seed = MemoryRecord {
            id: "__seed__".to_string(),
            memory: "seed".to_string(),
            user_id: "seed".to_string(),
            vector: vec![0.0; dims],
            metadata: serde_json::json!({}),
            memory_type: MemoryType::Unknown("seed".to_string()),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            hash: String::new(),
            chunk: String::new(),
            superseded_by: None,
        };
        let batch = records_to_batch(&[seed], dims as i32)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], table_schema(dims as i32));

        let reader = Box::new(reader) as Box<dyn RecordBatchReader + Send>;
        let table = conn
            .create_table(TABLE_NAME, reader)
            .execute()
            .await
            .map_err(|e| StorageError::OpenFailed {
                path: uri.to_string(),
                reason: format!("create table: {e}"),
            })?;

        table
            .delete("id = '__seed__'")
            .await
            .map_err(|e| map_write_err("delete seed", e))?;

        info!(path = %uri, dims, "memory table created");
        Ok(table)
    }

    /// Vector dimensionality this handle was opened with.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Re-open the table handle to observe commits from other processes.
    pub async fn refresh(&self) -> CodexfiResult<()> {
        let fresh = self
            .conn
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| StorageError::OpenFailed {
                path: TABLE_NAME.to_string(),
                reason: e.to_string(),
            })?;
        *self.table.write().await = fresh;
        Ok(())
    }

    /// Append rows.
    pub async fn add(&self, records: &[MemoryRecord]) -> CodexfiResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let batch = records_to_batch(records, self.dims as i32)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], table_schema(self.dims as i32));
        let reader = Box::new(reader) as Box<dyn RecordBatchReader + Send>;
        let table = self.table.read().await.clone();
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| map_write_err("add", e))?;
        Ok(())
    }

    /// Upsert rows keyed on `id`.
    pub async fn merge_insert(&self, records: &[MemoryRecord]) -> CodexfiResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let batch = records_to_batch(records, self.dims as i32)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], table_schema(self.dims as i32));
        let table = self.table.read().await.clone();
        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| map_write_err("merge_insert", e))?;
        Ok(())
    }

    /// Set string columns on every row matching `predicate`.
    pub async fn update_where(
        &self,
        predicate: &str,
        sets: &[(&str, &str)],
    ) -> CodexfiResult<()> {
        let table = self.table.read().await.clone();
        let mut update = table.update().only_if(predicate);
        for (column, value) in sets {
            update = update.column(*column, quote_literal(value));
        }
        update
            .execute()
            .await
            .map_err(|e| map_write_err("update", e))?;
        Ok(())
    }

    /// Delete every row matching `predicate`.
    pub async fn delete(&self, predicate: &str) -> CodexfiResult<()> {
        let table = self.table.read().await.clone();
        table
            .delete(predicate)
            .await
            .map_err(|e| map_write_err("delete", e))?;
        Ok(())
    }

    /// Delete one row by id. Missing ids succeed (idempotent).
    pub async fn delete_by_id(&self, id: &str) -> CodexfiResult<()> {
        let id = validate_id(id, "id")?;
        self.delete(&format!("id = '{id}'")).await
    }

    /// Point lookup by id.
    pub async fn get(&self, id: &str) -> CodexfiResult<Option<MemoryRecord>> {
        let id = validate_id(id, "id")?;
        let rows = self.scan(Some(&format!("id = '{id}'")), Some(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn count_rows(&self, predicate: Option<&str>) -> CodexfiResult<usize> {
        let table = self.table.read().await.clone();
        let n = table
            .count_rows(predicate.map(|p| p.to_string()))
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("count_rows: {e}"),
            })?;
        Ok(n)
    }

    /// Nearest-neighbor search by cosine distance. The predicate prefilters,
    /// so `limit` applies to matching rows.
    pub async fn vector_search(
        &self,
        vector: &[f32],
        predicate: Option<&str>,
        limit: usize,
    ) -> CodexfiResult<Vec<(MemoryRecord, f32)>> {
        let table = self.table.read().await.clone();
        let mut query = table
            .vector_search(vector)
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("vector_search: {e}"),
            })?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(p) = predicate {
            query = query.only_if(p);
        }

        let batches = query
            .execute()
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("vector_search execute: {e}"),
            })?
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("vector_search collect: {e}"),
            })?;

        let mut out = Vec::new();
        for batch in &batches {
            for (record, distance) in batch_to_records(batch)? {
                let distance = distance.ok_or_else(|| StorageError::DecodeFailed {
                    reason: "vector search batch missing _distance".to_string(),
                })?;
                out.push((record, distance));
            }
        }
        // Ascending distance across batches.
        out.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    /// Filtered scan without a query vector.
    pub async fn scan(
        &self,
        predicate: Option<&str>,
        limit: Option<usize>,
    ) -> CodexfiResult<Vec<MemoryRecord>> {
        let table = self.table.read().await.clone();
        let mut query = table.query();
        if let Some(p) = predicate {
            query = query.only_if(p);
        }
        if let Some(n) = limit {
            query = query.limit(n);
        }

        let batches = query
            .execute()
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("scan execute: {e}"),
            })?
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: format!("scan collect: {e}"),
            })?;

        let mut out = Vec::new();
        for batch in &batches {
            for (record, _) in batch_to_records(batch)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Mark `old_id` as superseded by `new_id` and bump its `updated_at`.
    pub async fn mark_superseded(&self, old_id: &str, new_id: &str) -> CodexfiResult<()> {
        let old_id = validate_id(old_id, "id")?;
        let new_id = validate_id(new_id, "superseded_by")?;
        self.update_where(
            &format!("id = '{old_id}'"),
            &[
                ("superseded_by", new_id.as_str()),
                ("updated_at", to_rfc3339(chrono::Utc::now()).as_str()),
            ],
        )
        .await
    }
}

/// Concurrent commits surface as conflicts; those are the only write
/// errors worth retrying.
fn map_write_err(op: &str, e: lancedb::Error) -> StorageError {
    let reason = format!("{op}: {e}");
    let lowered = reason.to_ascii_lowercase();
    if lowered.contains("conflict") || lowered.contains("concurrent") {
        StorageError::WriteConflict { reason }
    } else {
        StorageError::QueryFailed { reason }
    }
}
