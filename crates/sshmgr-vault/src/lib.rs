//! Credential vault and connection registry for sshmgr.
//!
//! Connection profiles live in a single JSON registry file that is replaced
//! atomically on save. Sensitive fields are sealed individually with
//! AES-256-GCM under a key derived from the user's passphrase (Argon2id),
//! so names and hosts stay searchable while the vault is locked.

pub mod codec;
pub mod credcache;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod store;

pub use credcache::{CmdKeyCache, CredentialCache};
pub use crypto::{KdfParams, VaultKey};
pub use error::{Result, VaultError};
pub use lifecycle::{CredentialManager, RdpHandoff, RevealHandle, VaultSession};
pub use registry::{Registry, Search};
pub use store::{RecordStore, VaultFile, VaultHeader};
