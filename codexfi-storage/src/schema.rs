//! Arrow schema for the `memories` table and record <-> batch conversion.

use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use chrono::{DateTime, SecondsFormat, Utc};

use codexfi_core::errors::StorageError;
use codexfi_core::memory::{MemoryRecord, MemoryType};

pub const TABLE_NAME: &str = "memories";

/// Column layout. `superseded_by` is the empty string for active rows so
/// the filter `superseded_by = ''` stays a scalar predicate.
pub fn table_schema(dims: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("memory", DataType::Utf8, false),
        Field::new("user_id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dims),
            false,
        ),
        Field::new("metadata_json", DataType::Utf8, false),
        Field::new("memory_type", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("updated_at", DataType::Utf8, false),
        Field::new("hash", DataType::Utf8, false),
        Field::new("chunk", DataType::Utf8, false),
        Field::new("superseded_by", DataType::Utf8, false),
    ]))
}

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build one RecordBatch from records. Every vector must match `dims`.
pub fn records_to_batch(records: &[MemoryRecord], dims: i32) -> Result<RecordBatch, StorageError> {
    for r in records {
        if r.vector.len() != dims as usize {
            return Err(StorageError::DecodeFailed {
                reason: format!(
                    "record {} has vector length {}, table is {dims}",
                    r.id,
                    r.vector.len()
                ),
            });
        }
    }

    let ids = StringArray::from(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>());
    let memories =
        StringArray::from(records.iter().map(|r| r.memory.as_str()).collect::<Vec<_>>());
    let user_ids =
        StringArray::from(records.iter().map(|r| r.user_id.as_str()).collect::<Vec<_>>());
    let metadata = StringArray::from(
        records
            .iter()
            .map(|r| r.metadata.to_string())
            .collect::<Vec<_>>(),
    );
    let types = StringArray::from(
        records
            .iter()
            .map(|r| r.memory_type.as_str().to_string())
            .collect::<Vec<_>>(),
    );
    let created = StringArray::from(
        records
            .iter()
            .map(|r| to_rfc3339(r.created_at))
            .collect::<Vec<_>>(),
    );
    let updated = StringArray::from(
        records
            .iter()
            .map(|r| to_rfc3339(r.updated_at))
            .collect::<Vec<_>>(),
    );
    let hashes = StringArray::from(records.iter().map(|r| r.hash.as_str()).collect::<Vec<_>>());
    let chunks = StringArray::from(records.iter().map(|r| r.chunk.as_str()).collect::<Vec<_>>());
    let superseded = StringArray::from(
        records
            .iter()
            .map(|r| r.superseded_by.as_deref().unwrap_or(""))
            .collect::<Vec<_>>(),
    );

    let flat: Vec<f32> = records.iter().flat_map(|r| r.vector.iter().copied()).collect();
    let inner = Arc::new(Field::new("item", DataType::Float32, true));
    let vectors = FixedSizeListArray::new(inner, dims, Arc::new(Float32Array::from(flat)), None);

    RecordBatch::try_new(
        table_schema(dims),
        vec![
            Arc::new(ids) as ArrayRef,
            Arc::new(memories),
            Arc::new(user_ids),
            Arc::new(vectors),
            Arc::new(metadata),
            Arc::new(types),
            Arc::new(created),
            Arc::new(updated),
            Arc::new(hashes),
            Arc::new(chunks),
            Arc::new(superseded),
        ],
    )
    .map_err(|e| StorageError::DecodeFailed {
        reason: format!("record batch: {e}"),
    })
}

/// Decode a result batch into records plus the `_distance` column when the
/// batch came from a vector search.
pub fn batch_to_records(
    batch: &RecordBatch,
) -> Result<Vec<(MemoryRecord, Option<f32>)>, StorageError> {
    let str_col = |name: &str| -> Result<&StringArray, StorageError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| StorageError::DecodeFailed {
                reason: format!("missing column {name}"),
            })
    };

    let ids = str_col("id")?;
    let memories = str_col("memory")?;
    let user_ids = str_col("user_id")?;
    let metadata = str_col("metadata_json")?;
    let types = str_col("memory_type")?;
    let created = str_col("created_at")?;
    let updated = str_col("updated_at")?;
    let hashes = str_col("hash")?;
    let chunks = str_col("chunk")?;
    let superseded = str_col("superseded_by")?;

    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let vector = match vectors {
            Some(col) => {
                let inner = col.value(i);
                inner
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|f| f.values().to_vec())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        let superseded_by = match superseded.value(i) {
            "" => None,
            other => Some(other.to_string()),
        };

        let record = MemoryRecord {
            id: ids.value(i).to_string(),
            memory: memories.value(i).to_string(),
            user_id: user_ids.value(i).to_string(),
            vector,
            metadata: serde_json::from_str(metadata.value(i))
                .unwrap_or_else(|_| serde_json::json!({})),
            memory_type: MemoryType::from(types.value(i)),
            created_at: parse_ts(created.value(i))?,
            updated_at: parse_ts(updated.value(i))?,
            hash: hashes.value(i).to_string(),
            chunk: chunks.value(i).to_string(),
            superseded_by,
        };
        out.push((record, distances.map(|d| d.value(i))));
    }
    Ok(out)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::DecodeFailed {
            reason: format!("timestamp {raw:?}: {e}"),
        })
}

/// Quote a string for use inside a filter predicate or update expression.
/// The expression grammar unescapes only a doubled quote; backslashes have
/// no escape meaning and must pass through untouched.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
