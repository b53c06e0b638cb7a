//! End-to-end scenarios over a real table with scripted stubs.

mod common;

use std::time::Duration;

use codexfi_core::memory::{IngestEvent, MemoryType};
use codexfi_engine::{IngestOptions, ListOptions, SearchOptions};

use common::{at_cosine, fact, harness, messages, unit};

const SCOPE: &str = "cx_project_0123456789abcdef";

/// Sequential ingests get distinct millisecond timestamps.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn s1_cross_session_continuity() {
    let h = harness().await;
    let memory = "Project uses SQLite via a Repository pattern; commands: add, list, done";
    let query = "what project is this";

    h.embedder.set(memory, unit(0));
    h.embedder.set(query, at_cosine(&unit(0), &unit(1), 0.8));
    h.extractor
        .push_extraction(vec![fact(memory, "architecture")]);

    let outcomes = h
        .engine
        .ingest(&messages("let me explain the project"), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].event, IngestEvent::Add);

    let hits = h
        .engine
        .search(query, SCOPE, SearchOptions::default())
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].memory.contains("SQLite"));
    assert!(hits[0].score >= 0.3);
}

#[tokio::test]
async fn s2_progress_replacement() {
    let h = harness().await;
    for text in ["v0.1 shipped", "v0.2 in progress", "v0.3 almost done"] {
        h.extractor.push_extraction(vec![fact(text, "progress")]);
        h.engine
            .ingest(&messages(text), SCOPE, IngestOptions::default())
            .await
            .unwrap();
        settle().await;
    }

    let progress: Vec<_> = h
        .engine
        .list(SCOPE, ListOptions::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.memory_type == MemoryType::Progress)
        .collect();
    assert_eq!(progress.len(), 1);
    assert!(progress[0].memory.contains("v0.3"));
}

#[tokio::test]
async fn s3_structural_dedup() {
    let h = harness().await;
    let first = "Authentication uses JWT in httpOnly cookies";
    let second = "Auth uses httpOnly JWT cookies";

    h.embedder.set(first, unit(0));
    // Within the structural radius (0.25) but outside the narrow one.
    h.embedder.set(second, at_cosine(&unit(0), &unit(1), 0.8));

    h.extractor.push_extraction(vec![fact(first, "architecture")]);
    let added = h
        .engine
        .ingest(&messages(first), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(added[0].event, IngestEvent::Add);
    settle().await;

    h.extractor.push_extraction(vec![fact(second, "architecture")]);
    let merged = h
        .engine
        .ingest(&messages(second), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(merged[0].event, IngestEvent::Update);
    assert_eq!(merged[0].id, added[0].id);

    let records = h.engine.list(SCOPE, ListOptions::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].memory, second);
    assert!(records[0].updated_at > records[0].created_at);
    // The stored vector stays from the first embed.
    assert_eq!(records[0].vector, unit(0));
}

#[tokio::test]
async fn s4_contradiction_supersede() {
    let h = harness().await;
    let old = "Database: Postgres 15";
    let new = "We migrated off Postgres; we now use CockroachDB";

    h.embedder.set(old, unit(0));
    // Outside structural dedup (0.25), inside the contradiction radius.
    h.embedder.set(new, at_cosine(&unit(0), &unit(1), 0.6));

    h.extractor.push_extraction(vec![fact(old, "tech-context")]);
    let first = h
        .engine
        .ingest(&messages(old), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    let postgres_id = first[0].id.clone();
    settle().await;

    h.extractor.push_extraction(vec![fact(new, "tech-context")]);
    h.extractor.push_contradictions(vec![postgres_id.clone()]);
    let second = h
        .engine
        .ingest(&messages(new), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(second[0].event, IngestEvent::Add);

    let active = h.engine.list(SCOPE, ListOptions::default()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].memory.contains("CockroachDB"));

    let all = h
        .engine
        .list(
            SCOPE,
            ListOptions {
                include_superseded: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let postgres = all.iter().find(|r| r.id == postgres_id).unwrap();
    assert_eq!(postgres.superseded_by.as_deref(), Some(second[0].id.as_str()));
}

#[tokio::test]
async fn s5_session_summary_aging() {
    let h = harness().await;
    h.extractor.set_condense(Some("Pattern"));

    for n in 1..=4 {
        let text = format!("summary D{n}");
        h.extractor
            .push_extraction(vec![fact(&text, "session-summary")]);
        h.engine
            .ingest(
                &messages(&text),
                SCOPE,
                IngestOptions {
                    mode: codexfi_core::memory::ExtractionMode::Summary,
                    metadata: None,
                },
            )
            .await
            .unwrap();
        settle().await;
    }

    let summaries = h
        .engine
        .list_by_type(SCOPE, &[MemoryType::SessionSummary], None)
        .await
        .unwrap();
    let texts: Vec<&str> = summaries.iter().map(|r| r.memory.as_str()).collect();
    assert_eq!(texts, vec!["summary D2", "summary D3", "summary D4"]);

    let patterns = h
        .engine
        .list_by_type(SCOPE, &[MemoryType::LearnedPattern], None)
        .await
        .unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].memory, "Pattern: summary D1");
}

#[tokio::test]
async fn s5_condensation_failure_still_deletes_oldest() {
    let h = harness().await;
    h.extractor.set_condense(None);

    for n in 1..=4 {
        let text = format!("summary D{n}");
        h.extractor
            .push_extraction(vec![fact(&text, "session-summary")]);
        h.engine
            .ingest(&messages(&text), SCOPE, IngestOptions::default())
            .await
            .unwrap();
        settle().await;
    }

    let summaries = h
        .engine
        .list_by_type(SCOPE, &[MemoryType::SessionSummary], None)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|r| r.memory != "summary D1"));

    let patterns = h
        .engine
        .list_by_type(SCOPE, &[MemoryType::LearnedPattern], None)
        .await
        .unwrap();
    assert!(patterns.is_empty());
}

#[tokio::test]
async fn s6_enumeration_union() {
    let h = harness().await;
    let pnpm = "uses pnpm for package management";
    h.embedder.set(pnpm, unit(2));
    h.embedder.set("pnpm", at_cosine(&unit(2), &unit(3), 0.85));

    let mut facts = vec![fact(pnpm, "preference")];
    for i in 0..29 {
        facts.push(fact(&format!("preference number {i}"), "preference"));
    }
    h.extractor.push_extraction(facts);
    let outcomes = h
        .engine
        .ingest(&messages("preferences dump"), SCOPE, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 30);

    let hits = h
        .engine
        .search(
            "pnpm",
            SCOPE,
            SearchOptions {
                limit: 10,
                types: Some(vec![MemoryType::Preference]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(hits.len() <= 10);
    assert!(hits[0].memory.contains("pnpm"));
    assert!(hits[0].score >= 0.5);
    for hit in &hits[1..] {
        assert!((hit.score - 0.25).abs() < 1e-6);
    }
    let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), hits.len());
}

#[tokio::test]
async fn recency_blend_promotes_newer_records() {
    let h = harness().await;
    let older = "older but closer fact";
    let newer = "newer but farther fact";
    let query = "query text";

    h.embedder.set(query, unit(0));
    h.embedder.set(older, at_cosine(&unit(0), &unit(1), 0.8));
    h.embedder.set(newer, at_cosine(&unit(0), &unit(1), 0.6));

    h.extractor.push_extraction(vec![fact(older, "learned-pattern")]);
    h.engine
        .ingest(
            &messages(older),
            SCOPE,
            IngestOptions {
                metadata: Some(serde_json::json!({"date": "2026-01-01"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    settle().await;

    h.extractor.push_extraction(vec![fact(newer, "learned-pattern")]);
    h.engine
        .ingest(
            &messages(newer),
            SCOPE,
            IngestOptions {
                metadata: Some(serde_json::json!({"date": "2026-07-01"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Pure semantic: the closer (older) record wins.
    let semantic = h
        .engine
        .search(query, SCOPE, SearchOptions { threshold: 0.0, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(semantic[0].memory, older);

    // Heavy recency weight flips the order.
    let blended = h
        .engine
        .search(
            query,
            SCOPE,
            SearchOptions {
                threshold: 0.0,
                recency_weight: 0.9,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(blended[0].memory, newer);
    assert_eq!(blended[0].date, "2026-07-01");
}
