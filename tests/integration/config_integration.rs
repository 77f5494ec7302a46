//! Layered configuration loading

use super::test_utils::IsolatedEnv;
use markgen::{CollisionPolicy, ConfigLoader, Orchestrator};
use std::time::Duration;

#[test]
fn layers_apply_in_precedence_order() {
    let mut env = IsolatedEnv::new();
    let workspace = env.workspace();

    let global = ConfigLoader::global_config_path().unwrap();
    std::fs::create_dir_all(global.parent().unwrap()).unwrap();
    std::fs::write(
        &global,
        "[cache]\ncapacity = 5\n[regeneration]\nmax_concurrent_invocations = 2\ntimeout_ms = 1000\n",
    )
    .unwrap();
    std::fs::write(
        workspace.join("markgen.toml"),
        "[regeneration]\nmax_concurrent_invocations = 3\nsame_declaration_collisions = \"first-wins\"\n",
    )
    .unwrap();
    env.set("MARKGEN__REGENERATION__TIMEOUT_MS", Some("250"));

    let config = ConfigLoader::load(&workspace).unwrap();
    assert_eq!(config.cache.capacity, 5);
    assert_eq!(config.regeneration.max_concurrent_invocations, 3);
    assert_eq!(config.regeneration.timeout_ms, Some(250));

    let orchestrator = Orchestrator::from_config(&config).unwrap();
    assert_eq!(orchestrator.cache().capacity(), 5);
    assert_eq!(orchestrator.settings().collision_policy, CollisionPolicy::FirstWins);
    assert_eq!(orchestrator.settings().timeout, Some(Duration::from_millis(250)));
}

#[test]
fn environment_specific_workspace_file_overrides_base() {
    let mut env = IsolatedEnv::new();
    let workspace = env.workspace();
    std::fs::write(workspace.join("markgen.toml"), "[cache]\ncapacity = 7\n").unwrap();
    std::fs::write(workspace.join("markgen.ci.toml"), "[cache]\ncapacity = 1\n").unwrap();
    env.set("MARKGEN_ENV", Some("ci"));

    assert_eq!(ConfigLoader::load(&workspace).unwrap().cache.capacity, 1);
}

#[test]
fn invalid_workspace_config_is_rejected() {
    let env = IsolatedEnv::new();
    let workspace = env.workspace();
    std::fs::write(
        workspace.join("markgen.toml"),
        "[regeneration]\nmax_concurrent_invocations = 0\n[logging]\nformat = \"xml\"\n",
    )
    .unwrap();

    let err = ConfigLoader::load(&workspace).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("max_concurrent_invocations"));
    assert!(message.contains("xml"));
}

#[test]
fn conflicting_marker_alias_fails_pipeline_construction() {
    let env = IsolatedEnv::new();
    let workspace = env.workspace();
    std::fs::write(
        workspace.join("markgen.toml"),
        "[[markers]]\nattribute = \"dup\"\ngenerator = \"Getters\"\nmodule = \"markgen_std\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load(&workspace).unwrap();
    let err = Orchestrator::from_config(&config).unwrap_err();
    assert_eq!(err.code(), "config");
}
