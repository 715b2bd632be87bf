//! Error types for the vault and registry.

use std::path::PathBuf;

use sshmgr_core::{ConnectionKind, SecretField};
use thiserror::Error;

/// Errors that can occur during vault and registry operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Authentication failed: secret was tampered with or the key is wrong")]
    Authentication,

    #[error("Corrupt registry file {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Registry file not found: {0}")]
    MissingStore(PathBuf),

    #[error("Failed to persist registry to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A connection named '{name}' already exists in folder '{folder}'")]
    DuplicateName { name: String, folder: String },

    #[error("A connection with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Vault is locked")]
    VaultLocked,

    #[error("The {field} of connection '{id}' is already revealed")]
    SecretAlreadyExposed { id: String, field: SecretField },

    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("'{0}' matches more than one connection")]
    Ambiguous(String),

    #[error("Connection '{id}' has no stored {field}")]
    NoSecret { id: String, field: SecretField },

    #[error("Connection '{id}' is {kind}, not usable here")]
    UnsupportedKind { id: String, kind: ConnectionKind },

    #[error("Revealed secret has expired")]
    Expired,

    #[error("Folder '{0}' is not empty")]
    FolderNotEmpty(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Unsupported secret algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Credential cache error: {0}")]
    CredentialCache(String),

    #[error(transparent)]
    Core(#[from] sshmgr_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
