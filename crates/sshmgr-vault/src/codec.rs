//! Secret field codec.
//!
//! Converts individual passwords and passphrases between plaintext and the
//! [`SecretValue`] stored in a profile. With no vault key (encryption
//! disabled) fields are kept as plaintext markers, and unwrapping a marker
//! is a passthrough, so callers share one code path for both modes.

use sshmgr_core::{SecretBlob, SecretString, SecretValue};

use crate::crypto::{self, VaultKey, ALGORITHM_ID};
use crate::error::{Result, VaultError};

/// Wrap `plaintext` for storage.
pub fn wrap(plaintext: &str, key: Option<&VaultKey>) -> Result<SecretValue> {
    match key {
        Some(key) => Ok(SecretValue::Sealed(crypto::encrypt(key, plaintext.as_bytes())?)),
        None => Ok(SecretValue::plain(plaintext)),
    }
}

/// Recover the plaintext of a stored field.
///
/// Sealed fields need the vault key; plaintext markers ignore it.
pub fn unwrap(value: &SecretValue, key: Option<&VaultKey>) -> Result<SecretString> {
    match value {
        SecretValue::Plain(secret) => Ok(secret.clone()),
        SecretValue::Sealed(blob) => {
            let key = key.ok_or(VaultError::VaultLocked)?;
            open_blob(blob, key)
        }
    }
}

fn open_blob(blob: &SecretBlob, key: &VaultKey) -> Result<SecretString> {
    if !is_supported(blob) {
        return Err(VaultError::UnsupportedAlgorithm(blob.algorithm.clone()));
    }
    let bytes = crypto::decrypt(key, blob)?;
    SecretString::from_utf8(bytes).ok_or(VaultError::Authentication)
}

/// Whether a field is sealed rather than a plaintext marker.
pub fn is_encrypted(value: &SecretValue) -> bool {
    value.is_sealed()
}

/// Whether this build can open the blob's algorithm.
pub fn is_supported(blob: &SecretBlob) -> bool {
    blob.algorithm == ALGORITHM_ID
}

/// Re-wrap a field from one key (or plaintext) to another.
pub fn rewrap(
    value: &SecretValue,
    old_key: Option<&VaultKey>,
    new_key: Option<&VaultKey>,
) -> Result<SecretValue> {
    let plaintext = unwrap(value, old_key)?;
    wrap(plaintext.expose_secret(), new_key)
}
