//! Tests for layered configuration loading.

use super::*;
use crate::{StoreDistance, StoreProvider};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn empty_config_uses_defaults() {
    let config = AmemConfig::load_from_str("{}").expect("config");
    assert_eq!(config, AmemConfig::default());
    assert_eq!(config.store.provider, StoreProvider::File);
    assert_eq!(config.store.path.as_deref(), Some(".amem/store"));
    assert_eq!(config.store.collection, "memories");
    assert!(config.store.extend);
    assert_eq!(config.store.dimensions, 256);
    assert!(config.system.load_existing);
    assert_eq!(config.search.k, 5);
    assert_eq!(config.search.similarity_threshold, None);
}

#[test]
fn parses_every_section() {
    let json5 = r#"{
        // comments are allowed
        store: { provider: "memory", collection: "notes", distance: "l2", dimensions: 64, extend: false },
        system: { load_existing: false },
        search: { k: 3, similarity_threshold: 0.75 },
    }"#;
    let config = AmemConfig::load_from_str(json5).expect("config");
    assert_eq!(config.store.provider, StoreProvider::Memory);
    assert_eq!(config.store.distance, StoreDistance::L2);
    assert_eq!(config.store.dimensions, 64);
    assert!(!config.store.extend);
    assert!(!config.system.load_existing);
    assert_eq!(config.search.k, 3);
    assert_eq!(config.search.similarity_threshold, Some(0.75));
}

#[test]
fn rejects_unknown_keys_with_location() {
    let err = AmemConfig::load_from_str("{ store: { backend: \"chroma\" } }").unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("config:store.backend"), "{msg}");
    assert!(msg.contains("unknown key"), "{msg}");
}

#[test]
fn rejects_wrong_types_and_values() {
    for (json5, path) in [
        ("{ store: { provider: \"chroma\" } }", "store.provider"),
        ("{ store: { dimensions: -1 } }", "store.dimensions"),
        ("{ system: { load_existing: \"yes\" } }", "system.load_existing"),
        ("{ search: { similarity_threshold: \"close\" } }", "search.similarity_threshold"),
    ] {
        let err = AmemConfig::load_from_str(json5).unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidField { path: p, .. } if p.ends_with(path)),
            "{json5}: {err}"
        );
    }
}

#[test]
fn validate_enforces_invariants() {
    for json5 in [
        "{ store: { dimensions: 0 } }",
        "{ search: { k: 0 } }",
        "{ search: { similarity_threshold: -0.5 } }",
        "{ store: { provider: \"file\", path: \"  \" } }",
        "{ store: { collection: \"\" } }",
    ] {
        let err = AmemConfig::load_from_str(json5).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{json5}: {err}");
    }
    AmemConfig::load_from_str("{ store: { provider: \"memory\", path: \"\" } }")
        .expect("memory provider needs no path");
}

#[test]
fn layers_merge_in_precedence_order() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        "{ store: { collection: \"system\", dimensions: 32 }, search: { k: 9 } }",
    );
    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ store: { collection: \"user\" } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ store: { collection: \"project\" }, search: { k: 4 } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ store: { collection: \"cwd\" } }",
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ search: { k: 2 } }");

    let options = LayeredConfigOptions {
        cwd: cwd.clone(),
        system_config_path: Some(system_config),
        user_config_path: Some(user_config),
        runtime_paths: Vec::new(),
        project_root_markers: vec![".git".to_string()],
    }
    .with_runtime_path(&runtime);
    let layered = AmemConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.store.collection, "cwd");
    assert_eq!(layered.config.store.dimensions, 32);
    assert_eq!(layered.config.search.k, 2);
    let sources: Vec<ConfigLayerSource> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime,
        ]
    );
}

#[test]
fn project_layer_in_cwd_is_loaded_once() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    fs::create_dir_all(root.join(".git")).expect("git");
    write_json5(&root.join(DEFAULT_CONFIG_FILE), "{ search: { k: 7 } }");

    let layered = AmemConfig::load_layered_with_options(LayeredConfigOptions::isolated(root))
        .expect("layered");
    assert_eq!(layered.config.search.k, 7);
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
}

#[test]
fn invalid_layer_names_its_source() {
    let temp = TempDir::new().expect("tmp");
    let runtime = temp.path().join("bad.json5");
    write_json5(&runtime, "{ search: { k: \"many\" } }");
    let err = AmemConfig::load_layered_with_options(
        LayeredConfigOptions::isolated(temp.path()).with_runtime_path(&runtime),
    )
    .unwrap_err();
    assert!(format!("{err}").contains("runtime("), "{err}");
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let err = AmemConfig::load_layered_with_options(
        LayeredConfigOptions::isolated(temp.path()).with_runtime_path(temp.path().join("nope.json5")),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
