//! Configuration loading and persistence.

use super::Config;
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};

/// Argon2 requires at least 8 KiB of memory per lane.
const MIN_KDF_MEMORY_KIB_PER_LANE: u32 = 8;

impl Config {
    /// Resolve the config file path, honoring `SSHMGR_CONFIG`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        match env::get_var(env::vars::CONFIG) {
            Some(path) => Ok(paths::expand_tilde(&path)),
            None => paths::config_file(),
        }
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load and validate the configuration at `path`, or at the default path.
    ///
    /// A missing file yields the defaults. Unreadable or invalid files are errors.
    pub fn load_checked(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let config = match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = Self::default_path()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;
        tracing::debug!(path = %path.display(), "saved config");

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Registry file location: `SSHMGR_REGISTRY`, then `store.path`, then the default.
    pub fn registry_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = env::get_var(env::vars::REGISTRY) {
            return Ok(paths::expand_tilde(&path));
        }
        match &self.store.path {
            Some(path) => Ok(paths::expand_tilde(&path.to_string_lossy())),
            None => paths::registry_file(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let vault = &self.vault;

        if vault.kdf_iterations == 0 {
            errors.push("vault.kdf_iterations must be greater than 0".to_string());
        }
        if vault.kdf_parallelism == 0 {
            errors.push("vault.kdf_parallelism must be greater than 0".to_string());
        }
        let min_memory = MIN_KDF_MEMORY_KIB_PER_LANE.saturating_mul(vault.kdf_parallelism.max(1));
        if vault.kdf_memory_kib < min_memory {
            errors.push(format!(
                "vault.kdf_memory_kib must be at least {} KiB, got {}",
                min_memory, vault.kdf_memory_kib
            ));
        }
        if vault.reveal_ttl_secs == 0 {
            errors.push("vault.reveal_ttl_secs must be greater than 0".to_string());
        }
        if vault.rdp_cleanup_grace_secs == 0 {
            errors.push("vault.rdp_cleanup_grace_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registry file path.
    pub fn registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.path = Some(path.into());
        self
    }

    /// Set the Argon2id cost parameters.
    pub fn kdf(mut self, iterations: u32, memory_kib: u32) -> Self {
        self.config.vault.kdf_iterations = iterations;
        self.config.vault.kdf_memory_kib = memory_kib;
        self
    }

    /// Set the reveal TTL in seconds.
    pub fn reveal_ttl_secs(mut self, secs: u64) -> Self {
        self.config.vault.reveal_ttl_secs = secs;
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: super::LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}
