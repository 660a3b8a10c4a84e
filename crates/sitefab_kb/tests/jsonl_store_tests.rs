//! Integration tests for the JSON-lines knowledge store.

use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use sitefab_kb::{
    fingerprint, FixPayload, JsonlKnowledgeStore, KnowledgeEntry, KnowledgeStore,
};

fn entry(log: &str, root_cause: &str) -> KnowledgeEntry {
    KnowledgeEntry::new(
        fingerprint(log),
        log,
        FixPayload {
            file: "src/components/Hero.tsx".to_string(),
            content: "export default function Hero() { return null }".to_string(),
        },
    )
    .with_root_cause(root_cause)
    .with_reasoning("Import the missing dependency")
    .by_agent("debugger")
}

/// Test that recorded entries survive a reload from disk.
#[tokio::test]
async fn test_append_and_reload() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("kb").join("incidents.jsonl");

    let store = JsonlKnowledgeStore::new(&path);
    let log = "Error: Cannot find module 'react'";
    store.record(entry(log, "react not installed")).await.unwrap();
    store
        .record(entry("TypeError: x is undefined", "missing guard"))
        .await
        .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);

    let reopened = JsonlKnowledgeStore::new(&path);
    let found = reopened.lookup_exact(&fingerprint(log)).await.unwrap().unwrap();
    assert_eq!(found.root_cause, "react not installed");
    assert_eq!(found.agent, "debugger");

    let stats = reopened.stats().await.unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.by_category.get("ModuleNotFound"), Some(&1));
}

/// Test that corrupt lines are skipped rather than failing the lookup.
#[tokio::test]
async fn test_corrupt_lines_are_skipped() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("incidents.jsonl");

    let good = serde_json::to_string(&entry("SyntaxError: bad token", "typo")).unwrap();
    fs::write(&path, format!("{{broken\n{}\n\nnot json at all\n", good)).unwrap();

    let store = JsonlKnowledgeStore::new(&path);
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.entries, 1);
    assert!(store
        .lookup_exact(&fingerprint("SyntaxError: bad token"))
        .await
        .unwrap()
        .is_some());
}

/// Test that a missing file behaves as an empty knowledge base.
#[tokio::test]
async fn test_missing_file_is_empty() {
    let temp = tempdir().unwrap();
    let store = JsonlKnowledgeStore::new(temp.path().join("none.jsonl"));

    assert!(store
        .lookup_exact(&fingerprint("Error: x"))
        .await
        .unwrap()
        .is_none());
    assert!(store.lookup_similar("Error: x", 3).await.unwrap().is_empty());
    assert_eq!(store.stats().await.unwrap().entries, 0);
}

/// Test that concurrent appends produce one intact line each.
#[tokio::test]
async fn test_concurrent_appends() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("incidents.jsonl");
    let store = Arc::new(JsonlKnowledgeStore::new(&path));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .record(entry(&format!("Error: step {} failed", i), "flaky"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reopened = JsonlKnowledgeStore::new(&path);
    assert_eq!(reopened.stats().await.unwrap().entries, 8);
}

/// Test similarity search across related failures.
#[tokio::test]
async fn test_similar_lookup() {
    let temp = tempdir().unwrap();
    let store = JsonlKnowledgeStore::new(temp.path().join("incidents.jsonl"));

    store
        .record(entry(
            "TypeError: Cannot read properties of undefined (reading 'map')",
            "items prop missing",
        ))
        .await
        .unwrap();
    store
        .record(entry("ReferenceError: window is not defined", "ssr access"))
        .await
        .unwrap();

    let similar = store
        .lookup_similar(
            "TypeError: Cannot read properties of undefined (reading 'filter')",
            2,
        )
        .await
        .unwrap();
    assert!(!similar.is_empty());
    assert_eq!(similar[0].entry.root_cause, "items prop missing");
}
