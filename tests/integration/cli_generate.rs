//! CLI route table against a real workspace

use super::test_utils::{fixture_orchestrator, IsolatedEnv};
use markgen::cli::{Cli, Commands, FileStatus, OutputFormat, RunContext};
use markgen::MarkgenConfig;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

fn write(root: &std::path::Path, path: &str, contents: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn generate_then_check_round_trip() {
    let env = IsolatedEnv::new();
    let workspace = env.workspace();
    write(&workspace, "src/model.rs", "#[dup(\"Draft\")]\n#[getters]\npub struct Order { id: u64 }\n");
    write(&workspace, "src/util.rs", "pub fn helper() {}\n");

    let context = RunContext::new(workspace.clone(), None).unwrap();
    let cancel = CancellationToken::new();

    let cli = Cli::try_parse_from(["markgen", "generate", "src", "--format", "json"]).unwrap();
    let outcome = context.execute(&cli.command, &cancel).await.unwrap();
    assert!(outcome.success);
    let value: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
    assert_eq!(value["files"][0]["source"], "src/model.rs");
    assert_eq!(value["files"][0]["status"], "written");
    assert_eq!(value["files"][1]["status"], "empty");

    let generated = std::fs::read_to_string(workspace.join("src/model.generated.rs")).unwrap();
    assert!(generated.contains("OrderDraft"));
    assert!(generated.contains("pub fn id (& self) -> & u64"));

    let check = Cli::try_parse_from(["markgen", "generate", "src", "--check"]).unwrap();
    assert!(context.execute(&check.command, &cancel).await.unwrap().success);

    // An edit makes the checked-in output stale
    write(&workspace, "src/model.rs", "#[dup(\"Final\")]\npub struct Order { id: u64 }\n");
    let stale = context.execute(&check.command, &cancel).await.unwrap();
    assert!(!stale.success);
    let report = context
        .generate(&[PathBuf::from("src")], None, true, &cancel)
        .await
        .unwrap();
    assert_eq!(report.files[0].status, FileStatus::Stale);
}

#[tokio::test]
async fn workspace_config_adds_marker_aliases() {
    let env = IsolatedEnv::new();
    let workspace = env.workspace();
    write(
        &workspace,
        "markgen.toml",
        r#"
[[markers]]
attribute = "clone_as"
generator = "Dup"
module = "markgen_std"
targets = ["struct"]
"#,
    );
    write(&workspace, "lib.rs", "#[clone_as(\"Twin\")]\npub struct A;\n#[clone_as(\"Twin\")]\npub enum E { X }\n");

    let context = RunContext::new(workspace.clone(), None).unwrap();
    let report = context
        .generate(&[PathBuf::from("lib.rs")], None, false, &CancellationToken::new())
        .await
        .unwrap();

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Written);
    assert_eq!(file.declarations, 1);
    assert_eq!(file.diagnostics.len(), 1);
    assert_eq!(file.diagnostics[0].code.as_deref(), Some("malformed-marker"));
    assert!(!report.is_success());
}

#[tokio::test]
async fn collisions_fail_the_file_and_keep_the_old_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let (orchestrator, _) = fixture_orchestrator();
    let context = RunContext::with_orchestrator(
        dir.path().to_path_buf(),
        MarkgenConfig::default(),
        orchestrator,
    );
    let cancel = CancellationToken::new();
    write(dir.path(), "lib.rs", "#[emit(\"Shared\")]\npub struct A;\n");
    context
        .generate(&[PathBuf::from("lib.rs")], None, false, &cancel)
        .await
        .unwrap();
    let before = std::fs::read_to_string(dir.path().join("lib.generated.rs")).unwrap();

    write(dir.path(), "lib.rs", "#[emit(\"Shared\")]\npub struct A;\n#[emit(\"Shared\")]\npub struct B;\n");
    let outcome = context
        .execute(
            &Commands::Generate {
                paths: vec![PathBuf::from("lib.rs")],
                out_dir: None,
                check: false,
                format: OutputFormat::Text,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.output.contains("error[name-collision]"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lib.generated.rs")).unwrap(),
        before
    );
}

#[tokio::test]
async fn scan_reports_rejected_markers() {
    let env = IsolatedEnv::new();
    let workspace = env.workspace();
    write(&workspace, "lib.rs", "#[getters]\npub enum E { A }\n#[dup(\"X\")]\npub struct S;\n");
    let context = RunContext::new(workspace, None).unwrap();

    let outcome = context
        .execute(
            &Commands::Scan {
                path: PathBuf::from("lib.rs"),
                format: OutputFormat::Text,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.output.contains("#[dup]"));
    assert!(outcome.output.contains("error[malformed-marker]"));
}
