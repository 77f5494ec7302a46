//! Generator resolution across the search path

use super::test_utils::{document, fixture_module, fixture_orchestrator, Counters, FIXTURE_MODULE};
use markgen::registry::GeneratorRegistry;
use markgen::{GeneratorIdentity, Orchestrator, SearchPath, StaticLocation};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_documents_share_one_load_per_identity() {
    let (orchestrator, counters) = fixture_orchestrator();
    let orchestrator = Arc::new(orchestrator);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let doc = markgen::Document::parse(
                    format!("doc{i}.rs"),
                    format!("#[counted]\npub struct S{i};\n#[dup(\"X\")]\npub struct T{i};\n"),
                )
                .unwrap();
                orchestrator.regenerate(&doc, &CancellationToken::new()).await
            })
        })
        .collect();
    for handle in handles {
        let unit = handle.await.unwrap().unwrap();
        assert_eq!(unit.declarations.len(), 2);
    }

    // Counted and Dup were each loaded once
    assert_eq!(orchestrator.registry().generator_loads(), 2);
    // Counted is not reentrant: one instance per invocation
    assert_eq!(counters.instantiations(), 8);
    assert_eq!(counters.invocations(), 8);
}

#[tokio::test]
async fn non_reentrant_generators_get_a_fresh_instance_per_marker() {
    let (orchestrator, counters) = fixture_orchestrator();
    let doc = document("#[counted]\npub struct A;\n#[counted]\npub struct B;\n");
    orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(counters.instantiations(), 2);
}

#[test]
fn first_location_on_the_search_path_wins() {
    let shadowing = Arc::new(Counters::default());
    let shadowed = Arc::new(Counters::default());
    let registry = GeneratorRegistry::new(
        SearchPath::new()
            .with_location(StaticLocation::new("first").with_module(Arc::new(fixture_module(&shadowing))))
            .with_location(StaticLocation::new("second").with_module(Arc::new(fixture_module(&shadowed)))),
    );
    let loaded = registry
        .resolve(&GeneratorIdentity::new("Emit", FIXTURE_MODULE))
        .unwrap();
    assert_eq!(loaded.location, "first");
}

#[test]
fn missing_module_reports_every_searched_location() {
    let registry = GeneratorRegistry::new(
        SearchPath::new()
            .with_location(StaticLocation::builtin())
            .with_location(StaticLocation::new("empty")),
    );
    let err = registry
        .resolve(&GeneratorIdentity::new("Emit", "nowhere"))
        .unwrap_err();
    assert_eq!(err.code(), "generator-not-found");
    let message = err.to_string();
    assert!(message.contains("builtin"));
    assert!(message.contains("empty"));
}

#[test]
fn builtin_location_exposes_the_standard_module() {
    let orchestrator =
        Orchestrator::with_search_path(SearchPath::new().with_location(StaticLocation::builtin()))
            .unwrap();
    let modules = orchestrator.registry().modules();
    assert!(modules
        .iter()
        .any(|m| m.module == markgen::builtin::MODULE_NAME && m.exports.contains(&"Dup".to_string())));
    assert!(orchestrator.catalog().get("dup").is_some());
    assert!(orchestrator.catalog().get("getters").is_some());
}

#[test]
fn directory_locations_need_dynamic_loading() {
    let result = SearchPath::from_config(&["builtin".to_string(), "/opt/generators".to_string()]);
    if cfg!(feature = "dylib") {
        assert_eq!(result.unwrap().locations().len(), 2);
    } else {
        assert_eq!(result.unwrap_err().code(), "config");
    }
}
