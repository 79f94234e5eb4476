use std::time::Duration;
use tasksync::config::Config;
use tasksync::constants::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.remote.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.remote.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(config.sync.auto_sync_interval_secs, 30);
    assert_eq!(config.sync.auto_sync_interval(), Duration::from_secs(30));
    assert!(config.sync.connectivity_probe_enabled);
    assert!(!config.storage.in_memory);
    assert!(!config.logging.enabled);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // Valid config should pass
    assert!(config.validate().is_ok());

    config.remote.page_size = 0;
    assert!(config.validate().is_err());

    config.remote.page_size = 20;
    config.sync.auto_sync_interval_secs = 0;
    assert!(config.validate().is_err());

    config.sync.auto_sync_interval_secs = 30;
    config.remote.base_url = "not a url".to_string();
    assert!(config.validate().is_err());

    config.remote.base_url = DEFAULT_BASE_URL.to_string();
    config.logging.level = "chatty".to_string();
    assert!(config.validate().is_err());

    config.logging.level = "debug".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_probe_interval_only_checked_when_enabled() {
    let mut config = Config::default();
    config.sync.connectivity_probe_interval_secs = 0;
    assert!(config.validate().is_err());

    config.sync.connectivity_probe_enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("auto_sync_interval_secs = 30"));
    assert!(toml_str.contains("[remote]"));
}

#[test]
fn test_partial_config_deserialization() {
    let partial_toml = r#"
[remote]
base_url = "https://tasks.example.com"

[logging]
enabled = true
"#;

    let config: Config = toml::from_str(partial_toml).unwrap();

    assert_eq!(config.remote.base_url, "https://tasks.example.com");
    assert!(config.logging.enabled);

    // Unspecified values fall back to defaults
    assert_eq!(config.remote.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(config.sync.auto_sync_interval_secs, 30);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_empty_config_deserialization() {
    let config: Config = toml::from_str("").unwrap();
    let default_config = Config::default();

    assert_eq!(config.remote.base_url, default_config.remote.base_url);
    assert_eq!(
        config.sync.auto_sync_interval_secs,
        default_config.sync.auto_sync_interval_secs
    );
    assert_eq!(config.logging.enabled, default_config.logging.enabled);
}

#[test]
fn test_generate_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tasksync.toml");

    Config::generate_default_config(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# tasksync Configuration File"));
    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.remote.base_url, DEFAULT_BASE_URL);
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasksync.toml");
    std::fs::write(&path, "[remote]\npage_size = 5000\n").unwrap();

    assert!(Config::load_from_file(&path).is_err());
}

#[test]
fn test_explicit_database_path_wins() {
    let mut config = Config::default();
    config.storage.database_path = "/tmp/custom.db".to_string();
    assert_eq!(
        config.storage.resolve_database_path().unwrap(),
        std::path::PathBuf::from("/tmp/custom.db")
    );
}
