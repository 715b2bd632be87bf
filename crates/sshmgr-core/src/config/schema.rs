//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main sshmgr configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Registry file settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Vault key derivation and secret lifetime settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry file settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Override for the registry file (defaults to ~/.sshmgr/registry.json).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Vault settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Argon2id passes used when a new passphrase is set.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id memory cost in KiB.
    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    /// Argon2id lanes.
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Seconds a revealed secret stays readable.
    #[serde(default = "default_reveal_ttl_secs")]
    pub reveal_ttl_secs: u64,

    /// Seconds before a credential handed to the OS cache for RDP is removed.
    #[serde(default = "default_rdp_cleanup_grace_secs")]
    pub rdp_cleanup_grace_secs: u64,
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_memory_kib() -> u32 {
    19 * 1024
}

fn default_kdf_parallelism() -> u32 {
    1
}

fn default_reveal_ttl_secs() -> u64 {
    30
}

fn default_rdp_cleanup_grace_secs() -> u64 {
    30
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_parallelism: default_kdf_parallelism(),
            reveal_ttl_secs: default_reveal_ttl_secs(),
            rdp_cleanup_grace_secs: default_rdp_cleanup_grace_secs(),
        }
    }
}

impl VaultConfig {
    /// Lifetime of a revealed secret.
    pub fn reveal_ttl(&self) -> Duration {
        Duration::from_secs(self.reveal_ttl_secs)
    }

    /// Grace period before an RDP credential is purged from the OS cache.
    pub fn rdp_cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.rdp_cleanup_grace_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
