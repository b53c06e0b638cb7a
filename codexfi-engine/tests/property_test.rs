//! Property suite: lifecycle invariants under randomized ingest streams
//! with duplicates and contradictions mixed in.

mod common;

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use codexfi_core::memory::{MemoryRecord, MemoryType};
use codexfi_engine::IngestOptions;

use common::{at_cosine, cosine_distance, fact, harness, messages};

const SCOPE: &str = "cx_project_aaaa0000bbbb1111";

#[derive(Debug, Clone)]
enum Op {
    /// A fresh fact for a concept.
    New(u8),
    /// Restate a previously ingested concept verbatim.
    Duplicate(u8),
    /// A revision that semantically replaces the concept's current fact.
    Contradict(u8),
    Progress,
    Summary,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..24).prop_map(Op::New),
        1 => (0u8..24).prop_map(Op::Duplicate),
        1 => (0u8..24).prop_map(Op::Contradict),
        1 => Just(Op::Progress),
        1 => Just(Op::Summary),
    ]
}

fn concept_text(concept: u8) -> String {
    format!("concept {concept}: an established fact about this project")
}

async fn run_ops(ops: Vec<Op>) -> Vec<MemoryRecord> {
    let h = harness().await;
    h.extractor.contradict_everything();
    h.extractor.set_condense(Some("Distilled"));

    let mut ingested: HashSet<u8> = HashSet::new();
    let mut revision = 0u32;

    for op in ops {
        let (text, tag) = match op {
            // A duplicate of a never-seen concept is just a first ingest;
            // both use the concept's canonical text, so a restatement
            // lands at distance zero and merges.
            Op::New(c) | Op::Duplicate(c) => {
                ingested.insert(c);
                (concept_text(c), "learned-pattern")
            }
            Op::Contradict(c) => {
                if !ingested.contains(&c) {
                    ingested.insert(c);
                    (concept_text(c), "learned-pattern")
                } else {
                    revision += 1;
                    let text = format!("concept {c}: revised understanding #{revision}");
                    let base = h.embedder.hash_vector(&concept_text(c));
                    let lean = h.embedder.hash_vector(&format!("lean {revision}"));
                    // Close enough to be a contradiction candidate, far
                    // enough to dodge dedup.
                    h.embedder.set(&text, at_cosine(&base, &lean, 0.7));
                    (text, "learned-pattern")
                }
            }
            Op::Progress => {
                revision += 1;
                (format!("milestone update #{revision}"), "progress")
            }
            Op::Summary => {
                revision += 1;
                (format!("session recap #{revision}"), "session-summary")
            }
        };

        h.extractor.push_extraction(vec![fact(&text, tag)]);
        h.engine
            .ingest(&messages(&text), SCOPE, IngestOptions::default())
            .await
            .unwrap();
    }

    h.engine.table().scan(None, None).await.unwrap()
}

fn check_invariants(rows: &[MemoryRecord]) -> Result<(), TestCaseError> {
    let by_id: HashMap<&str, &MemoryRecord> =
        rows.iter().map(|r| (r.id.as_str(), r)).collect();
    let active: Vec<&MemoryRecord> = rows.iter().filter(|r| r.is_active()).collect();

    // 1. No active pair sits inside the dedup radius.
    for (i, a) in active.iter().enumerate() {
        for b in active.iter().skip(i + 1) {
            let distance = cosine_distance(&a.vector, &b.vector);
            prop_assert!(
                distance > a.memory_type.dedup_threshold(),
                "active pair within dedup radius: {} / {} at {distance}",
                a.memory,
                b.memory
            );
        }
    }

    // 2. superseded_by chains terminate without cycles.
    for row in rows {
        let mut visited = HashSet::new();
        let mut cursor = row;
        while let Some(next_id) = &cursor.superseded_by {
            prop_assert!(
                visited.insert(cursor.id.clone()),
                "cycle through {}",
                cursor.id
            );
            match by_id.get(next_id.as_str()) {
                Some(next) => cursor = next,
                // Successor was physically deleted; chain ends.
                None => break,
            }
        }
    }

    // 3. At most one active progress record.
    let progress = active
        .iter()
        .filter(|r| r.memory_type == MemoryType::Progress)
        .count();
    prop_assert!(progress <= 1, "{progress} active progress records");

    // 4. At most three active session summaries.
    let summaries = active
        .iter()
        .filter(|r| r.memory_type == MemoryType::SessionSummary)
        .count();
    prop_assert!(summaries <= 3, "{summaries} active session summaries");

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 3,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lifecycle_invariants_hold_under_random_ingest(
        ops in proptest::collection::vec(op_strategy(), 100..130)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let rows = runtime.block_on(run_ops(ops));
        check_invariants(&rows)?;
    }
}
