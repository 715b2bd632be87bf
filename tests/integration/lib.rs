//! Shared fixtures for the integration tests.

use std::path::PathBuf;

use sshmgr_core::config::{Config, ConfigBuilder};
use sshmgr_vault::{KdfParams, RecordStore};
use tempfile::TempDir;

/// Argon2id parameters cheap enough for tests.
pub fn fast_kdf() -> KdfParams {
    KdfParams::new(1, 64, 1)
}

/// A scratch directory with a registry path inside it.
pub struct Scratch {
    pub dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.path().join("registry.json")
    }

    pub fn store(&self) -> RecordStore {
        RecordStore::new(self.registry_path())
    }

    /// Config pointing at this scratch registry, with fast key derivation.
    pub fn config(&self) -> Config {
        ConfigBuilder::new()
            .registry_path(self.registry_path())
            .kdf(1, 64)
            .build()
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}
