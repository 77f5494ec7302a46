//! Incremental cache reuse across regenerations

use super::test_utils::{document, fixture_orchestrator};
use markgen::{Document, IncrementalCache};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn unchanged_document_hits_the_cache_and_renders_identically() {
    let (orchestrator, counters) = fixture_orchestrator();
    let doc = document("#[counted]\npub struct A;\n#[counted]\npub struct B;\n");
    let cancel = CancellationToken::new();

    let first = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    assert_eq!(counters.invocations(), 2);

    let second = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    assert_eq!(counters.invocations(), 2);
    assert_eq!(orchestrator.cache().stats().hits, 2);
    assert_eq!(*first, *second);
    assert_eq!(first.render(), second.render());
}

#[tokio::test]
async fn edits_miss_the_cache() {
    let (orchestrator, counters) = fixture_orchestrator();
    let cancel = CancellationToken::new();

    orchestrator
        .regenerate(&document("#[counted]\npub struct A;\n"), &cancel)
        .await
        .unwrap();
    let edited = orchestrator
        .regenerate(&document("#[counted]\npub struct A;\n// edited\n"), &cancel)
        .await
        .unwrap();

    assert_eq!(counters.invocations(), 2);
    assert_eq!(edited.declaration_names(), vec!["ACounted"]);
    assert_eq!(orchestrator.cache().stats().documents, 2);
}

#[tokio::test]
async fn cached_diagnostics_are_replayed() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[warns]\npub struct Odd;\n");
    let cancel = CancellationToken::new();

    let first = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    let second = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(second.diagnostics.len(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[fails]\npub struct A;\n");
    let cancel = CancellationToken::new();

    orchestrator.regenerate(&doc, &cancel).await.unwrap();
    orchestrator.regenerate(&doc, &cancel).await.unwrap();
    let stats = orchestrator.cache().stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.fragments, 0);
}

#[tokio::test]
async fn eviction_forces_regeneration_on_next_miss() {
    let (orchestrator, counters) = fixture_orchestrator();
    let orchestrator = orchestrator.with_cache(Arc::new(IncrementalCache::new(1)));
    let cancel = CancellationToken::new();

    let a = Document::parse("a.rs", "#[counted]\npub struct A;\n").unwrap();
    let b = Document::parse("b.rs", "#[counted]\npub struct B;\n").unwrap();

    orchestrator.regenerate(&a, &cancel).await.unwrap();
    orchestrator.regenerate(&b, &cancel).await.unwrap();
    assert!(!orchestrator.cache().contains_document(&a.fingerprint()));
    assert_eq!(counters.invocations(), 2);

    orchestrator.regenerate(&a, &cancel).await.unwrap();
    assert_eq!(counters.invocations(), 3);
}

#[tokio::test]
async fn marker_arguments_are_part_of_the_key() {
    let (orchestrator, counters) = fixture_orchestrator();
    let cancel = CancellationToken::new();
    let doc = document("#[emit(\"One\")]\npub struct A;\n#[emit(\"Two\")]\npub struct B;\n");

    let unit = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    assert_eq!(unit.declaration_names(), vec!["One", "Two"]);
    assert_eq!(counters.invocations(), 2);
    assert_eq!(orchestrator.cache().stats().fragments, 2);
}
