//! Cancellation and deadlines never publish partial output

use super::test_utils::{document, fixture_orchestrator};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn cancelling_keeps_previous_unit() {
    let (orchestrator, counters) = fixture_orchestrator();
    let path = Path::new("src/lib.rs");

    let v1 = document("#[dup(\"X\")]\npub struct Foo;\n");
    let previous = orchestrator
        .regenerate(&v1, &CancellationToken::new())
        .await
        .unwrap();

    let v2 = document("#[hang]\npub struct Foo;\n#[dup(\"Y\")]\npub struct Bar;\n");
    let cancel = CancellationToken::new();
    let (result, _) = tokio::join!(orchestrator.regenerate(&v2, &cancel), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(counters.hanging(), 1);
    let published = orchestrator.published(path).unwrap();
    assert_eq!(*published, *previous);
    assert_eq!(published.declaration_names(), vec!["FooX"]);
}

#[tokio::test]
async fn already_cancelled_token_does_nothing() {
    let (orchestrator, counters) = fixture_orchestrator();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .regenerate(&document("#[counted]\npub struct A;\n"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(counters.invocations(), 0);
    assert!(orchestrator.published(Path::new("src/lib.rs")).is_none());
}

#[tokio::test(start_paused = true)]
async fn deadline_cancels_hanging_generators() {
    let (orchestrator, counters) = fixture_orchestrator();
    let doc = document("#[hang]\npub struct A;\n#[hang]\npub struct B;\n");

    let err = orchestrator
        .regenerate_with_deadline(&doc, &CancellationToken::new(), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(counters.hanging(), 2);
    assert!(orchestrator.published(Path::new("src/lib.rs")).is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_regeneration_cancels_its_invocations() {
    let (orchestrator, counters) = fixture_orchestrator();
    let doc = document("#[hang]\npub struct A;\n");
    let cancel = CancellationToken::new();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        orchestrator.regenerate(&doc, &cancel),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(counters.hanging(), 1);
    // The caller's token is untouched; only the dropped run's scope was cancelled
    assert!(!cancel.is_cancelled());

    let unit = orchestrator
        .regenerate(&document("#[dup(\"X\")]\npub struct A;\n"), &cancel)
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["AX"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_does_not_poison_the_cache() {
    let (orchestrator, counters) = fixture_orchestrator();
    let doc = document("#[counted]\npub struct A;\n#[hang]\npub struct B;\n");

    let err = orchestrator
        .regenerate_with_deadline(&doc, &CancellationToken::new(), Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    // The completed sibling is reusable, the hanging one never reached the cache
    let stats = orchestrator.cache().stats();
    assert_eq!(stats.fragments, 1);
    assert_eq!(counters.invocations(), 1);
}
