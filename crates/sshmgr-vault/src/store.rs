//! Registry persistence.
//!
//! The whole registry lives in one JSON file:
//!
//! ```text
//! { "header": { format_version, encryption_enabled, kdf, canary, checksum },
//!   "body":   { folders: [...], profiles: [...] } }
//! ```
//!
//! The checksum is a SHA-256 over the canonical JSON of the header (minus
//! the checksum itself) and the body. Saves write a sibling temporary file,
//! sync it, and rename it over the target, so readers only ever see a
//! complete old or complete new file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sshmgr_core::{ConnectionProfile, FolderPath, SecretBlob};
use tracing::{debug, info};

use crate::crypto::{self, KdfParams, VaultKey, KDF_ALGORITHM};
use crate::error::{Result, VaultError};
use crate::registry::Registry;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Plaintext sealed into the header canary to check passphrases.
pub(crate) const CANARY_PLAINTEXT: &[u8] = b"sshmgr-vault-canary-v1";

const CHECKSUM_FIELD: &str = "checksum";

/// Key derivation settings recorded in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfHeader {
    pub algorithm: String,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl KdfHeader {
    pub fn params(&self) -> KdfParams {
        KdfParams::new(self.iterations, self.memory_kib, self.parallelism)
    }
}

/// Registry file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultHeader {
    pub format_version: u32,
    pub encryption_enabled: bool,
    #[serde(default)]
    pub kdf: Option<KdfHeader>,
    /// Known plaintext sealed under the vault key.
    #[serde(default)]
    pub canary: Option<SecretBlob>,
}

impl Default for VaultHeader {
    fn default() -> Self {
        Self::unencrypted()
    }
}

impl VaultHeader {
    /// Header for a registry that stores secrets as plaintext.
    pub fn unencrypted() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            encryption_enabled: false,
            kdf: None,
            canary: None,
        }
    }

    /// Header for a new passphrase, with a fresh salt and canary.
    ///
    /// Returns the derived key alongside so the caller does not derive twice.
    pub fn encrypted(passphrase: &str, params: KdfParams) -> Result<(Self, VaultKey)> {
        let salt = crypto::generate_salt();
        let key = crypto::derive_key(passphrase, &salt, &params)?;
        let canary = crypto::encrypt(&key, CANARY_PLAINTEXT)?;
        let header = Self {
            format_version: FORMAT_VERSION,
            encryption_enabled: true,
            kdf: Some(KdfHeader {
                algorithm: KDF_ALGORITHM.to_string(),
                salt,
                iterations: params.iterations,
                memory_kib: params.memory_kib,
                parallelism: params.parallelism,
            }),
            canary: Some(canary),
        };
        Ok((header, key))
    }
}

/// A loaded registry file: header plus registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultFile {
    pub header: VaultHeader,
    pub registry: Registry,
}

#[derive(Serialize, Deserialize)]
struct StoredBody {
    #[serde(default)]
    folders: Vec<FolderPath>,
    #[serde(default)]
    profiles: Vec<ConnectionProfile>,
}

#[derive(Deserialize)]
struct RawFile {
    header: Value,
    body: Value,
}

/// File-backed registry store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Create a store for the registry file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the location named by `config`.
    pub fn from_config(config: &sshmgr_core::Config) -> Result<Self> {
        let path = config
            .registry_path()
            .map_err(|e| VaultError::Core(sshmgr_core::Error::Config(e)))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used while saving.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "registry".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the registry. A missing file yields an empty, unencrypted registry.
    pub fn load(&self) -> Result<VaultFile> {
        match self.read() {
            Err(VaultError::MissingStore(path)) => {
                debug!(path = %path.display(), "no registry file yet, starting empty");
                Ok(VaultFile::default())
            }
            other => other,
        }
    }

    /// Load the registry, reporting a missing file as [`VaultError::MissingStore`].
    pub fn read(&self) -> Result<VaultFile> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VaultError::MissingStore(self.path.clone()));
            }
            Err(e) => return Err(VaultError::Io(e)),
        };
        let file = decode(&data).map_err(|reason| VaultError::CorruptStore {
            path: self.path.clone(),
            reason,
        })?;
        debug!(
            path = %self.path.display(),
            profiles = file.registry.len(),
            encrypted = file.header.encryption_enabled,
            "loaded registry"
        );
        Ok(file)
    }

    /// Atomically replace the registry file.
    ///
    /// On failure the previous file is left untouched.
    pub fn save(&self, file: &VaultFile) -> Result<()> {
        let data = encode(file)?;
        self.write_atomic(&data)
            .map_err(|source| VaultError::Persistence {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path.display(), profiles = file.registry.len(), "saved registry");
        Ok(())
    }

    fn write_atomic(&self, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let result = write_synced(&temp_path, data).and_then(|()| fs::rename(&temp_path, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

/// Write `data` to `path` with mode 0600 on Unix, sync, and verify the size.
fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()?;

    let written = file.metadata()?.len();
    if written != data.len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {written} of {} bytes", data.len()),
        ));
    }
    Ok(())
}

fn checksum(header: &Value, body: &Value) -> Result<String> {
    let canonical = serde_json::to_vec(&serde_json::json!({ "header": header, "body": body }))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn encode(file: &VaultFile) -> Result<Vec<u8>> {
    let body = serde_json::to_value(StoredBody {
        folders: file.registry.folders().cloned().collect(),
        profiles: file.registry.profiles().to_vec(),
    })?;
    let mut header = serde_json::to_value(&file.header)?;
    let sum = checksum(&header, &body)?;
    if let Value::Object(map) = &mut header {
        map.insert(CHECKSUM_FIELD.to_string(), Value::String(sum));
    }

    let out = serde_json::json!({ "header": header, "body": body });
    Ok(serde_json::to_vec_pretty(&out)?)
}

fn decode(data: &[u8]) -> std::result::Result<VaultFile, String> {
    let raw: RawFile = serde_json::from_slice(data).map_err(|e| format!("not a registry file: {e}"))?;

    let mut header = raw.header;
    let map = header
        .as_object_mut()
        .ok_or_else(|| "header is not an object".to_string())?;

    let version = map
        .get("format_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| "header has no format_version".to_string())?;
    if version != u64::from(FORMAT_VERSION) {
        return Err(format!("unsupported format version {version}"));
    }

    let stored_sum = match map.remove(CHECKSUM_FIELD) {
        Some(Value::String(sum)) => sum,
        _ => return Err("header has no checksum".to_string()),
    };
    let expected = checksum(&header, &raw.body).map_err(|e| e.to_string())?;
    if stored_sum != expected {
        return Err("checksum mismatch".to_string());
    }

    let header: VaultHeader = serde_json::from_value(header).map_err(|e| format!("bad header: {e}"))?;
    if header.encryption_enabled && (header.kdf.is_none() || header.canary.is_none()) {
        return Err("encrypted registry is missing its key derivation parameters".to_string());
    }

    let body: StoredBody = serde_json::from_value(raw.body).map_err(|e| format!("bad body: {e}"))?;
    let registry = Registry::from_parts(body.folders, body.profiles).map_err(|e| e.to_string())?;

    Ok(VaultFile { header, registry })
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
