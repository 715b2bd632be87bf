//! Per-invocation state shared by the registry commands.

use std::path::PathBuf;

use anyhow::Context as _;
use sshmgr_core::{env, Config, ConnectionProfile, SecretString, SecretValue};
use sshmgr_vault::{CredentialManager, RecordStore, Registry, VaultFile, VaultSession};
use tracing::debug;

/// Loaded configuration, registry file, and credential manager.
pub struct Context {
    pub config: Config,
    pub store: RecordStore,
    pub file: VaultFile,
    pub manager: CredentialManager,
}

impl Context {
    /// Load the registry named by `registry` or by the config.
    pub fn open(config: Config, registry: Option<PathBuf>) -> anyhow::Result<Self> {
        let store = match registry {
            Some(path) => RecordStore::new(path),
            None => RecordStore::from_config(&config)?,
        };
        let file = store
            .load()
            .with_context(|| format!("Failed to load registry {}", store.path().display()))?;
        let manager = CredentialManager::from_config(&config);

        Ok(Self {
            config,
            store,
            file,
            manager,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.file.registry
    }

    /// Resolve a user-supplied id, prefix, or name to a profile.
    pub fn resolve(&self, query: &str) -> anyhow::Result<&ConnectionProfile> {
        Ok(self.file.registry.resolve(query)?)
    }

    /// Unlock the vault, prompting for the passphrase if one is set.
    ///
    /// Key derivation runs on a blocking thread.
    pub async fn unlock(&mut self) -> anyhow::Result<()> {
        if self.manager.is_unlocked() {
            return Ok(());
        }

        let header = self.file.header.clone();
        let passphrase = if header.encryption_enabled {
            read_passphrase()?
        } else {
            SecretString::default()
        };

        let session = tokio::task::spawn_blocking(move || {
            VaultSession::derive(&header, passphrase.expose_secret())
        })
        .await??;
        self.manager.unlock_with(session);
        Ok(())
    }

    /// Wrap a new secret under the current vault mode.
    pub async fn seal(&mut self, plaintext: &str) -> anyhow::Result<SecretValue> {
        self.unlock().await?;
        Ok(self.manager.seal(plaintext)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.store.save(&self.file)?;
        Ok(())
    }

    /// Lock the vault before exit.
    pub fn close(&mut self) {
        self.manager.lock();
        debug!("session closed");
    }
}

/// The vault passphrase, from `SSHMGR_PASSPHRASE` or a prompt.
pub fn read_passphrase() -> anyhow::Result<SecretString> {
    if let Some(passphrase) = env::get_var(env::vars::PASSPHRASE) {
        return Ok(SecretString::new(passphrase));
    }
    prompt_secret("Vault passphrase: ")
}

/// A new vault passphrase, from `SSHMGR_NEW_PASSPHRASE` or a confirmed prompt.
pub fn read_new_passphrase() -> anyhow::Result<SecretString> {
    if let Some(passphrase) = env::get_var(env::vars::NEW_PASSPHRASE) {
        return Ok(SecretString::new(passphrase));
    }

    let first = prompt_secret("New vault passphrase: ")?;
    if first.is_empty() {
        anyhow::bail!("Passphrase must not be empty");
    }
    let second = prompt_secret("Repeat new passphrase: ")?;
    if first != second {
        anyhow::bail!("Passphrases do not match");
    }
    Ok(first)
}

/// Read a secret from the terminal without echo.
pub fn prompt_secret(prompt: &str) -> anyhow::Result<SecretString> {
    let value = rpassword::prompt_password(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?;
    Ok(SecretString::new(value))
}
