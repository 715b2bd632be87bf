//! Credential lifecycle: unlocking, scoped reveals, locking.
//!
//! The [`CredentialManager`] moves between two settled states, locked and
//! unlocked. Unlocking goes through [`VaultSession::derive`], which does the
//! slow key derivation without touching the manager; dropping the result
//! abandons the attempt. Once unlocked, secrets are only ever handed out as
//! [`RevealHandle`]s whose buffers are wiped when the handle is dropped or
//! completed, when the reveal TTL runs out, or when the vault locks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use sshmgr_core::{ConnectionKind, SecretField, SecretString, SecretValue};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec;
use crate::credcache::CredentialCache;
use crate::crypto::{self, KdfParams, VaultKey, KDF_ALGORITHM};
use crate::error::{Result, VaultError};
use crate::registry::Registry;
use crate::store::{VaultHeader, CANARY_PLAINTEXT};

/// Key material for one unlocked period.
///
/// Holds no key when the registry has encryption disabled.
#[derive(Debug)]
pub struct VaultSession {
    key: Option<VaultKey>,
}

impl VaultSession {
    /// Derive and verify the session key for `header`.
    ///
    /// This is the expensive part of unlocking. It borrows nothing from the
    /// manager, so it can run on a blocking thread and be abandoned.
    pub fn derive(header: &VaultHeader, passphrase: &str) -> Result<Self> {
        if !header.encryption_enabled {
            return Ok(Self { key: None });
        }

        let (kdf, canary) = match (&header.kdf, &header.canary) {
            (Some(kdf), Some(canary)) => (kdf, canary),
            _ => {
                return Err(VaultError::KeyDerivation(
                    "header has no key derivation parameters".to_string(),
                ))
            }
        };
        if kdf.algorithm != KDF_ALGORITHM {
            return Err(VaultError::UnsupportedAlgorithm(kdf.algorithm.clone()));
        }
        if passphrase.is_empty() {
            return Err(VaultError::InvalidPassphrase);
        }

        let key = crypto::derive_key(passphrase, &kdf.salt, &kdf.params())?;
        match crypto::decrypt(&key, canary) {
            Ok(plaintext) if plaintext.as_slice() == CANARY_PLAINTEXT => {}
            Ok(_) | Err(VaultError::Authentication) => return Err(VaultError::InvalidPassphrase),
            Err(e) => return Err(e),
        }
        Ok(Self { key: Some(key) })
    }

    pub fn key(&self) -> Option<&VaultKey> {
        self.key.as_ref()
    }

    /// Whether secrets written in this session are sealed.
    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }
}

/// Shared slot behind a [`RevealHandle`].
struct Exposure {
    secret: Mutex<Option<SecretString>>,
    deadline: Instant,
}

impl Exposure {
    fn is_live(&self) -> bool {
        Instant::now() < self.deadline && self.secret.lock().is_some()
    }

    fn wipe(&self) {
        // SecretString zeroizes on drop.
        self.secret.lock().take();
    }
}

/// Scoped access to one decrypted secret.
///
/// The plaintext is wiped when the handle is dropped or completed, when the
/// reveal TTL elapses, or when the vault is locked. Afterwards every access
/// fails with [`VaultError::Expired`].
pub struct RevealHandle {
    profile_id: String,
    field: SecretField,
    exposure: Arc<Exposure>,
}

impl RevealHandle {
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn field(&self) -> SecretField {
        self.field
    }

    /// Whether the plaintext is still available.
    pub fn is_live(&self) -> bool {
        self.exposure.is_live()
    }

    /// Run `f` with the plaintext.
    pub fn with_secret<R>(&self, f: impl FnOnce(&str) -> R) -> Result<R> {
        let mut slot = self.exposure.secret.lock();
        if Instant::now() >= self.exposure.deadline {
            slot.take();
            return Err(VaultError::Expired);
        }
        match slot.as_ref() {
            Some(secret) => Ok(f(secret.expose_secret())),
            None => Err(VaultError::Expired),
        }
    }

    /// Finish with the secret and wipe it now.
    pub fn complete(self) {}
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.exposure.wipe();
    }
}

impl fmt::Debug for RevealHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealHandle")
            .field("profile_id", &self.profile_id)
            .field("field", &self.field)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Guard for a credential staged in the OS cache for an RDP launch.
///
/// The cached entry is removed after the grace period, or earlier once
/// [`connection_closed`](Self::connection_closed) is called or the guard is
/// dropped.
#[derive(Debug)]
pub struct RdpHandoff {
    target: String,
    closed: Option<oneshot::Sender<()>>,
    cleanup: Option<JoinHandle<()>>,
}

impl RdpHandoff {
    /// Credential-cache target the password was stored under.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Report that the RDP session ended (or failed to start).
    pub fn connection_closed(&mut self) {
        if let Some(tx) = self.closed.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the cached credential has been removed.
    ///
    /// Without [`connection_closed`](Self::connection_closed) this waits out
    /// the full grace period.
    pub async fn finished(&mut self) {
        if let Some(cleanup) = self.cleanup.as_mut() {
            if let Err(e) = cleanup.await {
                warn!(target = %self.target, error = %e, "credential cleanup task failed");
            }
            self.cleanup = None;
        }
    }
}

async fn remove_after(
    cache: Arc<dyn CredentialCache>,
    target: String,
    closed: oneshot::Receiver<()>,
    grace: Duration,
) {
    tokio::select! {
        _ = tokio::time::sleep(grace) => debug!(target = %target, "RDP grace period elapsed"),
        // A dropped guard counts as closed.
        _ = closed => debug!(target = %target, "RDP connection closed"),
    }

    let remove_target = target.clone();
    match tokio::task::spawn_blocking(move || cache.remove(&remove_target)).await {
        Ok(Ok(())) => info!(target = %target, "removed cached RDP credential"),
        Ok(Err(e)) => warn!(target = %target, error = %e, "failed to remove cached RDP credential"),
        Err(e) => warn!(target = %target, error = %e, "credential removal task failed"),
    }
}

/// Longest a reveal may live, whatever TTL was asked for.
pub const MAX_REVEAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Owns the session key and every outstanding reveal.
pub struct CredentialManager {
    session: Option<VaultSession>,
    reveal_ttl: Duration,
    exposures: HashMap<(String, SecretField), Weak<Exposure>>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("unlocked", &self.is_unlocked())
            .field("reveal_ttl", &self.reveal_ttl)
            .field("exposures", &self.exposures.len())
            .finish()
    }
}

impl CredentialManager {
    /// A locked manager whose reveals live for at most `reveal_ttl`,
    /// capped at [`MAX_REVEAL_TTL`].
    pub fn new(reveal_ttl: Duration) -> Self {
        Self {
            session: None,
            reveal_ttl: reveal_ttl.min(MAX_REVEAL_TTL),
            exposures: HashMap::new(),
        }
    }

    pub fn from_config(config: &sshmgr_core::Config) -> Self {
        Self::new(config.vault.reveal_ttl())
    }

    pub fn reveal_ttl(&self) -> Duration {
        self.reveal_ttl
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&VaultSession> {
        self.session.as_ref()
    }

    /// Derive the key for `header` and unlock.
    ///
    /// The passphrase is ignored when the registry has encryption disabled.
    pub fn unlock(&mut self, header: &VaultHeader, passphrase: &str) -> Result<&VaultSession> {
        let session = VaultSession::derive(header, passphrase)?;
        Ok(self.unlock_with(session))
    }

    /// Install a session derived elsewhere.
    pub fn unlock_with(&mut self, session: VaultSession) -> &VaultSession {
        self.wipe_exposures();
        info!(encrypted = session.is_encrypted(), "vault unlocked");
        self.session.insert(session)
    }

    /// Drop the key and wipe every revealed secret.
    pub fn lock(&mut self) {
        self.wipe_exposures();
        if self.session.take().is_some() {
            info!("vault locked");
        }
    }

    fn wipe_exposures(&mut self) {
        for (_, exposure) in self.exposures.drain() {
            if let Some(exposure) = exposure.upgrade() {
                exposure.wipe();
            }
        }
    }

    fn key(&self) -> Result<Option<&VaultKey>> {
        self.session
            .as_ref()
            .map(VaultSession::key)
            .ok_or(VaultError::VaultLocked)
    }

    /// Wrap a new secret for storage under the current session.
    pub fn seal(&self, plaintext: &str) -> Result<SecretValue> {
        codec::wrap(plaintext, self.key()?)
    }

    /// Reveal the login password of a profile.
    pub fn reveal(&mut self, registry: &Registry, profile_id: &str) -> Result<RevealHandle> {
        self.reveal_field(registry, profile_id, SecretField::Password)
    }

    /// Reveal one secret field of a profile.
    pub fn reveal_field(
        &mut self,
        registry: &Registry,
        profile_id: &str,
        field: SecretField,
    ) -> Result<RevealHandle> {
        self.key()?;
        let profile = registry
            .get(profile_id)
            .ok_or_else(|| VaultError::NotFound(profile_id.to_string()))?;
        let value = profile.secret_field(field).ok_or_else(|| VaultError::NoSecret {
            id: profile.id.clone(),
            field,
        })?;

        self.exposures.retain(|_, exposure| {
            exposure
                .upgrade()
                .map(|exposure| exposure.is_live())
                .unwrap_or(false)
        });
        let slot = (profile.id.clone(), field);
        if self.exposures.contains_key(&slot) {
            return Err(VaultError::SecretAlreadyExposed {
                id: profile.id.clone(),
                field,
            });
        }

        let secret = codec::unwrap(value, self.key()?)?;
        let exposure = Arc::new(Exposure {
            secret: Mutex::new(Some(secret)),
            // Capped in `new`, so this cannot overflow.
            deadline: Instant::now() + self.reveal_ttl,
        });
        self.exposures.insert(slot, Arc::downgrade(&exposure));
        schedule_expiry(&exposure);

        debug!(id = %profile.id, %field, "revealed secret");
        Ok(RevealHandle {
            profile_id: profile.id.clone(),
            field,
            exposure,
        })
    }

    /// Re-key every secret under `new_passphrase`, or store them as
    /// plaintext when it is `None`.
    ///
    /// `header` and `registry` are only touched if every field re-wraps;
    /// the caller saves them afterwards.
    pub fn change_passphrase(
        &mut self,
        header: &mut VaultHeader,
        registry: &mut Registry,
        new_passphrase: Option<&str>,
        params: KdfParams,
    ) -> Result<()> {
        let old_key = self.key()?;
        let (new_header, new_key) = match new_passphrase {
            Some(passphrase) => {
                let (header, key) = VaultHeader::encrypted(passphrase, params)?;
                (header, Some(key))
            }
            None => (VaultHeader::unencrypted(), None),
        };

        let mut staged = registry.clone();
        for profile in staged.profiles_mut() {
            for value in profile.secret_fields_mut() {
                *value = codec::rewrap(value, old_key, new_key.as_ref())?;
            }
        }

        *registry = staged;
        *header = new_header;
        self.session = Some(VaultSession { key: new_key });
        info!(encrypted = header.encryption_enabled, "vault passphrase changed");
        Ok(())
    }

    /// Stage an RDP profile's password in `cache` for the client to pick up.
    ///
    /// The plaintext is wiped as soon as the cache has it. Removal happens on
    /// a background task, so a tokio runtime must be running.
    pub fn hand_off_rdp(
        &mut self,
        registry: &Registry,
        profile_id: &str,
        cache: Arc<dyn CredentialCache>,
        grace: Duration,
    ) -> Result<RdpHandoff> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            VaultError::CredentialCache("no async runtime for credential cleanup".to_string())
        })?;
        let profile = registry
            .get(profile_id)
            .ok_or_else(|| VaultError::NotFound(profile_id.to_string()))?;
        if profile.kind() != ConnectionKind::Rdp {
            return Err(VaultError::UnsupportedKind {
                id: profile.id.clone(),
                kind: profile.kind(),
            });
        }
        let target = profile.credential_target();
        let username = profile.qualified_username();

        let handle = self.reveal(registry, profile_id)?;
        handle.with_secret(|secret| cache.store(&target, &username, secret))??;
        handle.complete();

        let (closed_tx, closed_rx) = oneshot::channel();
        let cleanup = runtime.spawn(remove_after(cache, target.clone(), closed_rx, grace));
        info!(target = %target, grace_secs = grace.as_secs(), "staged RDP credential");

        Ok(RdpHandoff {
            target,
            closed: Some(closed_tx),
            cleanup: Some(cleanup),
        })
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        self.lock();
    }
}

/// Wipe `exposure` at its deadline if a runtime is around to do it.
/// Without one, expiry is enforced on the next access.
fn schedule_expiry(exposure: &Arc<Exposure>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    let deadline = exposure.deadline;
    let weak = Arc::downgrade(exposure);
    runtime.spawn(async move {
        tokio::time::sleep_until(deadline).await;
        if let Some(exposure) = weak.upgrade() {
            exposure.wipe();
            debug!("reveal TTL elapsed, secret wiped");
        }
    });
}
