//! Name collisions abort the document and keep the previous unit

use super::test_utils::{document, fixture_orchestrator};
use markgen::{CollisionPolicy, RegenerationSettings, SynthError};
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cross_declaration_collision_keeps_previous_unit() {
    let (orchestrator, _) = fixture_orchestrator();
    let cancel = CancellationToken::new();

    let good = document("#[emit(\"Shared\")]\npub struct A;\n#[emit(\"Other\")]\npub struct B;\n");
    let previous = orchestrator.regenerate(&good, &cancel).await.unwrap();

    let broken = document("#[emit(\"Shared\")]\npub struct A;\n#[emit(\"Shared\")]\npub struct B;\n");
    match orchestrator.regenerate(&broken, &cancel).await.unwrap_err() {
        SynthError::SynthesizedNameCollision { name, first, second } => {
            assert_eq!(name, "Shared");
            assert_eq!(first.declaration, "A");
            assert_eq!(second.declaration, "B");
        }
        other => panic!("unexpected error: {other}"),
    }

    let published = orchestrator.published(Path::new("src/lib.rs")).unwrap();
    assert_eq!(*published, *previous);
}

#[tokio::test]
async fn collision_with_builtin_output_is_detected() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[dup(\"Copy\")]\npub struct Foo;\n#[emit(\"FooCopy\")]\npub struct Bar;\n");
    let err = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "name-collision");
}

#[tokio::test]
async fn same_declaration_collision_follows_configured_policy() {
    let source = "#[emit(\"Twice\")]\n#[emit(\"Twice\")]\npub struct A;\n";

    let (strict, _) = fixture_orchestrator();
    let err = strict
        .regenerate(&document(source), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "name-collision");

    let (lenient, _) = fixture_orchestrator();
    let lenient = lenient.with_settings(RegenerationSettings {
        collision_policy: CollisionPolicy::FirstWins,
        ..Default::default()
    });
    let unit = lenient
        .regenerate(&document(source), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["Twice"]);
    assert_eq!(unit.declarations[0].origin.attribute_index, 0);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].code.as_deref(), Some("name-collision"));
}

#[tokio::test]
async fn cached_fragments_are_revalidated() {
    let (orchestrator, counters) = fixture_orchestrator();
    let cancel = CancellationToken::new();
    let broken = document("#[emit(\"Shared\")]\npub struct A;\n#[emit(\"Shared\")]\npub struct B;\n");

    assert!(orchestrator.regenerate(&broken, &cancel).await.is_err());
    assert_eq!(counters.invocations(), 2);

    // Both fragments now come from the cache and still collide
    let err = orchestrator.regenerate(&broken, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "name-collision");
    assert_eq!(counters.invocations(), 2);
    assert_eq!(orchestrator.cache().stats().hits, 2);
    assert!(orchestrator.published(Path::new("src/lib.rs")).is_none());
}
