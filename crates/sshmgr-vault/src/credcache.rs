//! OS credential cache used to stage RDP logins.
//!
//! The RDP client reads its login from the platform credential store, so a
//! hand-off writes the password there just before launch and removes it
//! again afterwards.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// A place the RDP client can pick credentials up from.
pub trait CredentialCache: Send + Sync {
    /// Store `secret` for `username` under `target`, replacing any previous entry.
    fn store(&self, target: &str, username: &str, secret: &str) -> Result<()>;

    /// Remove whatever is stored under `target`.
    fn remove(&self, target: &str) -> Result<()>;
}

/// Windows credential manager, driven through `cmdkey.exe`.
#[derive(Debug, Clone)]
pub struct CmdKeyCache {
    program: PathBuf,
}

impl Default for CmdKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdKeyCache {
    pub fn new() -> Self {
        Self::with_program("cmdkey.exe")
    }

    /// Use a different executable with the same command line.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the program can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("/list:sshmgr-check")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    // Error messages name the action only; the arguments may hold a password.
    fn run(&self, action: &str, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                VaultError::CredentialCache(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            return Err(VaultError::CredentialCache(format!(
                "{action} exited with {}",
                output.status
            )));
        }
        Ok(())
    }
}

/// The `/pass:` argument, built in one allocation that is wiped on drop.
fn pass_arg(secret: &str) -> Zeroizing<String> {
    let mut arg = Zeroizing::new(String::with_capacity("/pass:".len() + secret.len()));
    arg.push_str("/pass:");
    arg.push_str(secret);
    arg
}

impl CredentialCache for CmdKeyCache {
    fn store(&self, target: &str, username: &str, secret: &str) -> Result<()> {
        debug!(target, username, "caching RDP credential");
        let generic = format!("/generic:{target}");
        let user = format!("/user:{username}");
        let pass = pass_arg(secret);
        self.run("credential store", &[&generic, &user, pass.as_str()])
    }

    fn remove(&self, target: &str) -> Result<()> {
        debug!(target, "removing cached RDP credential");
        self.run("credential removal", &[&format!("/delete:{target}")])
    }
}
