//! Argon2id passphrase derivation and AES-256-GCM sealing.
//!
//! The vault key is derived once per session from the passphrase and the
//! salt stored in the registry header. It is never used directly as a
//! cipher key: every blob gets its own random salt, from which HKDF-SHA256
//! derives a one-off AES key, and a fresh random nonce.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sshmgr_core::SecretBlob;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// Identifier written into every blob sealed by this module.
pub const ALGORITHM_ID: &str = "aes-256-gcm/hkdf-sha256/v1";

/// Identifier of the passphrase key derivation.
pub const KDF_ALGORITHM: &str = "argon2id";

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const BLOB_SALT_SIZE: usize = 32;
const HEADER_SALT_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// HKDF info string used to domain-separate per-blob keys.
const HKDF_INFO: &[u8] = b"sshmgr-secret-v1";

/// Argon2id cost parameters, persisted in the registry header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub fn new(iterations: u32, memory_kib: u32, parallelism: u32) -> Self {
        Self {
            iterations,
            memory_kib,
            parallelism,
        }
    }

    pub fn from_config(config: &sshmgr_core::config::VaultConfig) -> Self {
        Self::new(config.kdf_iterations, config.kdf_memory_kib, config.kdf_parallelism)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from_config(&sshmgr_core::config::VaultConfig::default())
    }
}

/// Key material derived from the vault passphrase. Zeroed on drop.
pub struct VaultKey(Zeroizing<[u8; KEY_SIZE]>);

impl VaultKey {
    fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// Derive the vault key from `passphrase` and the header `salt`.
pub fn derive_key(passphrase: &str, salt: &[u8], params: &KdfParams) -> Result<VaultKey> {
    if passphrase.is_empty() {
        return Err(VaultError::KeyDerivation(
            "passphrase must not be empty".to_string(),
        ));
    }

    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(VaultKey(key))
}

/// Fresh random salt for the registry header.
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; HEADER_SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive the per-blob AES key from the vault key and the blob salt.
fn derive_blob_key(key: &VaultKey, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), key.as_bytes());
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Seal `plaintext` under `key`.
///
/// Salt and nonce are drawn from the CSPRNG on every call, so sealing the
/// same plaintext twice never produces the same blob.
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<SecretBlob> {
    let mut salt = vec![0u8; BLOB_SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let blob_key = derive_blob_key(key, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&blob_key[..])
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    // aes-gcm appends the tag; keep it as its own field on disk.
    let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

    Ok(SecretBlob {
        algorithm: ALGORITHM_ID.to_string(),
        salt,
        nonce: nonce_bytes.to_vec(),
        ciphertext,
        tag,
    })
}

/// Open a blob produced by [`encrypt`].
///
/// Any failure to verify, including a malformed blob, is reported as
/// [`VaultError::Authentication`]; no plaintext is returned in that case.
pub fn decrypt(key: &VaultKey, blob: &SecretBlob) -> Result<Zeroizing<Vec<u8>>> {
    if blob.algorithm != ALGORITHM_ID {
        return Err(VaultError::UnsupportedAlgorithm(blob.algorithm.clone()));
    }
    if blob.nonce.len() != NONCE_SIZE || blob.tag.len() != TAG_SIZE {
        return Err(VaultError::Authentication);
    }

    let blob_key = derive_blob_key(key, &blob.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&blob_key[..])
        .map_err(|_| VaultError::Authentication)?;

    let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(&blob.ciphertext);
    sealed.extend_from_slice(&blob.tag);

    cipher
        .decrypt(Nonce::from_slice(&blob.nonce), sealed.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Authentication)
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams::new(1, 64, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(passphrase: &str) -> VaultKey {
        derive_key(passphrase, b"0123456789abcdef", &test_params()).unwrap()
    }

    #[test]
    fn test_round_trip_encrypt_decrypt() {
        let key = key("correct");
        let plaintext = b"hunter2";

        let blob = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &blob).unwrap();

        assert_eq!(decrypted.as_slice(), plaintext);
        assert_eq!(blob.algorithm, ALGORITHM_ID);
        assert_eq!(blob.tag.len(), TAG_SIZE);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = key("correct");
        let b = key("correct");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), key("other").as_bytes());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let result = derive_key("", b"0123456789abcdef", &test_params());
        assert!(matches!(result, Err(VaultError::KeyDerivation(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = derive_key("pw", b"0123456789abcdef", &KdfParams::new(0, 64, 1));
        assert!(matches!(result, Err(VaultError::KeyDerivation(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt(&key("correct"), b"sensitive data").unwrap();
        let result = decrypt(&key("wrong"), &blob);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = key("correct");
        let mut blob = encrypt(&key, b"important secret").unwrap();
        blob.ciphertext[1] ^= 0xff;
        assert!(matches!(decrypt(&key, &blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = key("correct");
        let mut blob = encrypt(&key, b"important secret").unwrap();
        blob.tag[0] ^= 0x01;
        assert!(matches!(decrypt(&key, &blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_truncated_nonce_fails() {
        let key = key("correct");
        let mut blob = encrypt(&key, b"x").unwrap();
        blob.nonce.pop();
        assert!(matches!(decrypt(&key, &blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let key = key("correct");
        let mut blob = encrypt(&key, b"x").unwrap();
        blob.algorithm = "rot13/v0".to_string();
        assert!(matches!(
            decrypt(&key, &blob),
            Err(VaultError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_call() {
        let key = key("correct");
        let a = encrypt(&key, b"same plaintext").unwrap();
        let b = encrypt(&key, b"same plaintext").unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_empty_plaintext_works() {
        let key = key("correct");
        let blob = encrypt(&key, b"").unwrap();
        assert!(decrypt(&key, &blob).unwrap().is_empty());
    }

    #[test]
    fn test_header_salt_is_random() {
        let a = generate_salt();
        assert_eq!(a.len(), HEADER_SALT_SIZE);
        assert_ne!(a, generate_salt());
    }

    #[test]
    fn test_key_debug_redacted() {
        assert_eq!(format!("{:?}", key("correct")), "VaultKey([REDACTED])");
    }
}
