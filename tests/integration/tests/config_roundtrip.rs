//! Config save/load roundtrip integration tests.

use sshmgr_core::config::{Config, ConfigBuilder, LogLevel};
use sshmgr_vault::{CredentialManager, KdfParams, RecordStore};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.vault.reveal_ttl_secs, 30);
    assert_eq!(loaded.vault.rdp_cleanup_grace_secs, 30);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let config = ConfigBuilder::new()
        .registry_path(dir.path().join("elsewhere.json"))
        .reveal_ttl_secs(5)
        .log_level(LogLevel::Debug)
        .build();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.vault.reveal_ttl_secs, 5);
    assert_eq!(loaded.logging.level, LogLevel::Debug);
    assert_eq!(loaded.store.path, Some(dir.path().join("elsewhere.json")));
}

#[test]
fn test_config_drives_vault_components() {
    let dir = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .registry_path(dir.path().join("registry.json"))
        .kdf(2, 128)
        .reveal_ttl_secs(7)
        .build();

    let params = KdfParams::from_config(&config.vault);
    assert_eq!(params, KdfParams::new(2, 128, 1));

    let manager = CredentialManager::from_config(&config);
    assert_eq!(manager.reveal_ttl(), Duration::from_secs(7));

    let store = RecordStore::from_config(&config).unwrap();
    if std::env::var_os("SSHMGR_REGISTRY").is_none() {
        assert_eq!(store.path(), dir.path().join("registry.json"));
    }
}

#[test]
fn test_config_validation_collects_errors() {
    let mut config = Config::default();
    config.vault.kdf_iterations = 0;
    config.vault.reveal_ttl_secs = 0;

    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("kdf_iterations"));
    assert!(message.contains("reveal_ttl_secs"));
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/config.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
