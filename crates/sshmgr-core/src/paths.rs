//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the sshmgr base directory (~/.sshmgr).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".sshmgr"))
}

/// Get the main config file path (~/.sshmgr/config.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("config.json5"))
}

/// Get the connection registry file path (~/.sshmgr/registry.json).
pub fn registry_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("registry.json"))
}

/// Default SSH private key (~/.ssh/id_rsa).
pub fn default_ssh_key() -> PathBuf {
    expand_tilde("~/.ssh/id_rsa")
}

/// Ensure the base directory exists.
pub fn ensure_dirs() -> Result<(), ConfigError> {
    std::fs::create_dir_all(base_dir()?)?;
    Ok(())
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir() {
        let dir = base_dir().unwrap();
        assert!(dir.ends_with(".sshmgr"));
    }

    #[test]
    fn test_registry_file() {
        let file = registry_file().unwrap();
        assert!(file.ends_with(".sshmgr/registry.json"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/test");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert_eq!(expand_tilde("/etc/ssh"), PathBuf::from("/etc/ssh"));
    }

    #[test]
    fn test_default_ssh_key() {
        assert!(default_ssh_key().ends_with(".ssh/id_rsa"));
    }
}
