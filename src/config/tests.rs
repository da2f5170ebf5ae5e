use super::*;
use std::collections::HashMap;
use tempfile::{NamedTempFile, TempDir};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert!(!config.embedding.text_only);
    assert!(config.history.include_diffs);
    assert_eq!(config.history.max_commits, 0);
    assert_eq!(config.search.top_k, 10);
    assert_eq!(config.search.preview_bytes, 2048);
    assert_eq!(config.search.fallback_preview_bytes, 4096);
}

#[test]
fn test_validate_valid_config() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validate_unknown_model() {
    let mut config = Config::default();
    config.embedding.model_name = "made-up-model".to_string();
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        SiftError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "embedding.model_name"
    ));

    // The model name is irrelevant when embeddings are disabled
    config.embedding.text_only = true;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_top_k() {
    let mut config = Config::default();
    config.search.top_k = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_zero_diff_bytes_only_matters_with_diffs() {
    let mut config = Config::default();
    config.history.max_diff_bytes = 0;
    assert!(config.validate().is_err());

    config.history.include_diffs = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_preview_bytes() {
    let mut config = Config::default();
    config.search.fallback_preview_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_serialized_config_loads_back() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.search.top_k = 25;
    config.history.max_commits = 500;
    config.embedding.text_only = true;

    std::fs::write(path, toml::to_string_pretty(&config).unwrap()).unwrap();
    let loaded = Config::from_file(path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[search]\ntop_k = 3\n").unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.search.top_k, 3);
    assert_eq!(loaded.search.preview_bytes, 2048);
    assert_eq!(loaded.embedding.model_name, "all-MiniLM-L6-v2");
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result,
        Err(SiftError::Config(ConfigError::FileNotFound(_)))
    ));
}

#[test]
fn test_load_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[search\ntop_k = ").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(SiftError::Config(ConfigError::ParseFailed(_)))
    ));
}

#[test]
fn test_env_overrides() {
    let mut config = Config::default();
    config.apply_overrides_from(lookup(&[
        ("SIFT_MODEL", "bge-small-en-v1.5"),
        ("SIFT_TOP_K", "5"),
        ("SIFT_TEXT_ONLY", "yes"),
        ("SIFT_MAX_DIFF_BYTES", "1024"),
    ]));

    assert_eq!(config.embedding.model_name, "bge-small-en-v1.5");
    assert_eq!(config.search.top_k, 5);
    assert!(config.embedding.text_only);
    assert_eq!(config.history.max_diff_bytes, 1024);
}

#[test]
fn test_unparsable_env_overrides_are_ignored() {
    let mut config = Config::default();
    config.apply_overrides_from(lookup(&[
        ("SIFT_TOP_K", "many"),
        ("SIFT_TEXT_ONLY", "maybe"),
    ]));
    assert_eq!(config, Config::default());
}
