//! End-to-end regeneration of single documents

use super::test_utils::{document, fixture_orchestrator};
use markgen::diagnostic::Severity;
use quote::ToTokens;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn document_without_markers_yields_empty_unit() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("pub struct Plain { x: i32 }\n#[derive(Debug)]\nenum E { A }\n");
    let cancel = CancellationToken::new();

    let first = orchestrator.regenerate(&doc, &cancel).await.unwrap();
    let second = orchestrator.regenerate(&doc, &cancel).await.unwrap();

    assert!(first.is_empty());
    assert!(first.diagnostics.is_empty());
    assert_eq!(*first, *second);
    assert_eq!(first.fingerprint, doc.fingerprint());
}

#[tokio::test]
async fn dup_copies_declaration_under_suffixed_name() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[derive(Clone)]\n#[dup(\"A\")]\npub struct Foo<T> { pub x: i32, y: Vec<T> }\n");

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["FooA"]);
    assert!(unit.diagnostics.is_empty());

    let generated: syn::ItemStruct = syn::parse_str(&unit.declarations[0].declaration.source).unwrap();
    let mut original: syn::ItemStruct =
        syn::parse_str("#[derive(Clone)] pub struct Foo<T> { pub x: i32, y: Vec<T> }").unwrap();
    original.ident = syn::Ident::new("FooA", original.ident.span());
    assert_eq!(
        generated.to_token_stream().to_string(),
        original.to_token_stream().to_string()
    );
}

#[tokio::test]
async fn two_marked_declarations_keep_source_order() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[dup(\"X\")]\npub struct Foo;\n#[dup(\"X\")]\npub struct Bar;\n");

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["FooX", "BarX"]);
    assert!(unit.diagnostics.is_empty());
}

#[tokio::test]
async fn unknown_generator_is_a_diagnostic_not_a_failure() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[missing]\npub struct Foo;\n#[dup(\"X\")]\npub struct Bar;\n");

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["BarX"]);
    assert_eq!(unit.diagnostics.len(), 1);
    let diagnostic = &unit.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.code.as_deref(), Some("generator-not-found"));
    assert_eq!(diagnostic.origin.as_ref().unwrap().declaration, "Foo");
}

#[tokio::test]
async fn per_marker_failures_are_isolated() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document(
        "#[panics]\npub struct A;\n#[fails]\npub struct B;\n#[wrongkind]\npub struct C;\n\
         #[dup(not_constant())]\npub struct D;\n#[dup(\"Ok\")]\npub struct E;\n",
    );

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unit.declaration_names(), vec!["EOk"]);

    let codes: Vec<(&str, &str)> = unit
        .diagnostics
        .iter()
        .map(|d| {
            (
                d.origin.as_ref().unwrap().declaration.as_str(),
                d.code.as_deref().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        codes,
        vec![
            ("A", "generator-execution"),
            ("B", "generator-execution"),
            ("C", "generator-load"),
            ("D", "malformed-marker"),
        ]
    );
    assert!(unit.diagnostics[0].message.contains("fixture generator exploded"));
    assert!(unit.has_errors());
}

#[tokio::test]
async fn generator_diagnostics_are_tagged_and_forwarded() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[warns]\npub struct Odd;\n");

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert!(unit.is_empty());
    assert_eq!(unit.diagnostics.len(), 2);
    assert_eq!(unit.diagnostics[0].severity, Severity::Warning);
    assert_eq!(unit.diagnostics[0].message, "`Odd` looks suspicious");
    assert_eq!(unit.diagnostics[1].severity, Severity::Info);
    assert!(unit
        .diagnostics
        .iter()
        .all(|d| d.origin.as_ref().map(|o| o.declaration.as_str()) == Some("Odd")));
    assert!(!unit.has_errors());
}

#[tokio::test]
async fn nested_modules_and_members_are_scanned() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document(
        "pub mod shapes {\n    #[getters]\n    pub struct Point { x: i32, y: i32 }\n}\n\
         pub struct Outer { #[emit(\"FromField\")] field: u8 }\n",
    );

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        unit.declaration_names(),
        vec!["shapes::Point::x", "shapes::Point::y", "FromField"]
    );
    assert_eq!(unit.declarations[0].declaration.namespace, vec!["shapes".to_string()]);

    let rendered = unit.render();
    assert!(rendered.contains("pub mod shapes {"));
    assert!(rendered.contains("// #[getters] on `shapes::Point`"));
}

#[tokio::test]
async fn successful_regeneration_is_published() {
    let (orchestrator, _) = fixture_orchestrator();
    let doc = document("#[dup(\"X\")]\npub struct Foo;\n");
    assert!(orchestrator.published(Path::new("src/lib.rs")).is_none());

    let unit = orchestrator
        .regenerate(&doc, &CancellationToken::new())
        .await
        .unwrap();
    let published = orchestrator.published(Path::new("src/lib.rs")).unwrap();
    assert_eq!(*published, *unit);
}
