//! Persisted representations of sensitive fields.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};

/// An encrypted, authenticated secret field.
///
/// Binary parts are base64-encoded on disk. A blob carries no plaintext and
/// is only meaningful together with the vault key that sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBlob {
    /// Algorithm identifier, e.g. `aes-256-gcm/hkdf-sha256/v1`.
    pub algorithm: String,

    /// Per-blob HKDF salt.
    #[serde(with = "b64")]
    pub salt: Vec<u8>,

    /// AEAD nonce, unique per encryption.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,

    /// Ciphertext without the authentication tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,

    /// AEAD authentication tag.
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
}

/// A secret field as stored in a connection profile.
///
/// `Plain` is the marker used when encryption is disabled; it serializes as a
/// bare string so unencrypted registries stay human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Sealed(SecretBlob),
    Plain(SecretString),
}

impl SecretValue {
    /// Create a plaintext marker.
    pub fn plain(value: impl Into<String>) -> Self {
        SecretValue::Plain(SecretString::new(value))
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, SecretValue::Sealed(_))
    }

    pub fn as_blob(&self) -> Option<&SecretBlob> {
        match self {
            SecretValue::Sealed(blob) => Some(blob),
            SecretValue::Plain(_) => None,
        }
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
