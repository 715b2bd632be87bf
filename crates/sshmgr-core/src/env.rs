//! Environment variable handling.

use std::env;

/// Well-known environment variable names.
pub mod vars {
    /// Overrides the config file location.
    pub const CONFIG: &str = "SSHMGR_CONFIG";
    /// Overrides the registry file location.
    pub const REGISTRY: &str = "SSHMGR_REGISTRY";
    /// Supplies the vault passphrase without prompting.
    pub const PASSPHRASE: &str = "SSHMGR_PASSPHRASE";
    /// Supplies the new passphrase for `sshmgr passwd`.
    pub const NEW_PASSPHRASE: &str = "SSHMGR_NEW_PASSPHRASE";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
