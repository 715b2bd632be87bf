//! Connection profile types.

use super::{FolderPath, SecretValue};
use crate::error::Error;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Remote protocol of a connection profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Ssh,
    Rdp,
}

impl ConnectionKind {
    /// Well-known port for the protocol.
    pub fn default_port(&self) -> u16 {
        match self {
            ConnectionKind::Ssh => 22,
            ConnectionKind::Rdp => 3389,
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Ssh => f.write_str("ssh"),
            ConnectionKind::Rdp => f.write_str("rdp"),
        }
    }
}

impl FromStr for ConnectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssh" => Ok(ConnectionKind::Ssh),
            "rdp" => Ok(ConnectionKind::Rdp),
            other => Err(Error::InvalidValue(format!("unknown connection kind '{other}'"))),
        }
    }
}

/// SSH authentication method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SshAuth {
    Password,
    #[default]
    Key,
}

impl FromStr for SshAuth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "password" => Ok(SshAuth::Password),
            "key" => Ok(SshAuth::Key),
            other => Err(Error::InvalidValue(format!("unknown ssh auth method '{other}'"))),
        }
    }
}

/// SSH-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    #[serde(default)]
    pub auth: SshAuth,

    /// Private key file; `~/.ssh/id_rsa` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Passphrase protecting the private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_passphrase: Option<SecretValue>,
}

impl SshOptions {
    /// Key path with `~` expanded, falling back to the default key.
    pub fn resolved_key_path(&self) -> PathBuf {
        match &self.key_path {
            Some(path) => paths::expand_tilde(&path.to_string_lossy()),
            None => paths::default_ssh_key(),
        }
    }
}

/// Remote desktop size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || Error::InvalidValue(format!("resolution must look like 1920x1080, got '{s}'"));
        let lower = s.to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Resolution { width, height })
    }
}

/// RDP-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdpOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    #[serde(default)]
    pub fullscreen: bool,
}

/// Protocol-specific options, tagged with the connection kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProtocolOptions {
    Ssh(SshOptions),
    Rdp(RdpOptions),
}

impl ProtocolOptions {
    pub fn kind(&self) -> ConnectionKind {
        match self {
            ProtocolOptions::Ssh(_) => ConnectionKind::Ssh,
            ProtocolOptions::Rdp(_) => ConnectionKind::Rdp,
        }
    }
}

/// Which sensitive field of a profile an operation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SecretField {
    /// Login password (SSH password auth or RDP).
    #[default]
    Password,
    /// Passphrase of the SSH private key.
    KeyPassphrase,
}

impl fmt::Display for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretField::Password => f.write_str("password"),
            SecretField::KeyPassphrase => f.write_str("key-passphrase"),
        }
    }
}

impl FromStr for SecretField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "password" => Ok(SecretField::Password),
            "key-passphrase" | "passphrase" => Ok(SecretField::KeyPassphrase),
            other => Err(Error::InvalidValue(format!("unknown secret field '{other}'"))),
        }
    }
}

/// A saved remote connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Unique id within the registry.
    pub id: String,

    /// Display name, unique within its folder.
    pub name: String,

    pub host: String,

    pub port: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "FolderPath::is_root")]
    pub folder: FolderPath,

    pub protocol: ProtocolOptions,

    /// Login password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl ConnectionProfile {
    /// New SSH profile with a fresh id and the default port.
    pub fn ssh(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(name, host, ProtocolOptions::Ssh(SshOptions::default()))
    }

    /// New RDP profile with a fresh id and the default port.
    pub fn rdp(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(name, host, ProtocolOptions::Rdp(RdpOptions::default()))
    }

    fn new(name: impl Into<String>, host: impl Into<String>, protocol: ProtocolOptions) -> Self {
        Self {
            id: crate::id::uuid(),
            name: name.into(),
            host: host.into(),
            port: protocol.kind().default_port(),
            username: String::new(),
            folder: FolderPath::root(),
            protocol,
            secret: None,
            last_used: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn in_folder(mut self, folder: FolderPath) -> Self {
        self.folder = folder;
        self
    }

    pub fn with_secret(mut self, secret: SecretValue) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn kind(&self) -> ConnectionKind {
        self.protocol.kind()
    }

    pub fn ssh_options(&self) -> Option<&SshOptions> {
        match &self.protocol {
            ProtocolOptions::Ssh(opts) => Some(opts),
            ProtocolOptions::Rdp(_) => None,
        }
    }

    pub fn ssh_options_mut(&mut self) -> Option<&mut SshOptions> {
        match &mut self.protocol {
            ProtocolOptions::Ssh(opts) => Some(opts),
            ProtocolOptions::Rdp(_) => None,
        }
    }

    pub fn rdp_options(&self) -> Option<&RdpOptions> {
        match &self.protocol {
            ProtocolOptions::Rdp(opts) => Some(opts),
            ProtocolOptions::Ssh(_) => None,
        }
    }

    pub fn rdp_options_mut(&mut self) -> Option<&mut RdpOptions> {
        match &mut self.protocol {
            ProtocolOptions::Rdp(opts) => Some(opts),
            ProtocolOptions::Ssh(_) => None,
        }
    }

    /// The stored value of a secret field, if any.
    pub fn secret_field(&self, field: SecretField) -> Option<&SecretValue> {
        match field {
            SecretField::Password => self.secret.as_ref(),
            SecretField::KeyPassphrase => self.ssh_options().and_then(|o| o.key_passphrase.as_ref()),
        }
    }

    /// Mutable access to every present secret field.
    pub fn secret_fields_mut(&mut self) -> Vec<&mut SecretValue> {
        let mut fields = Vec::with_capacity(2);
        if let Some(secret) = self.secret.as_mut() {
            fields.push(secret);
        }
        if let ProtocolOptions::Ssh(opts) = &mut self.protocol {
            if let Some(passphrase) = opts.key_passphrase.as_mut() {
                fields.push(passphrase);
            }
        }
        fields
    }

    /// Case-insensitive substring match over name and host.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.host.to_lowercase().contains(needle)
    }

    /// OS credential-cache target for this profile.
    pub fn credential_target(&self) -> String {
        self.host.clone()
    }

    /// Login name including the RDP domain when one is set.
    pub fn qualified_username(&self) -> String {
        match self.rdp_options().and_then(|o| o.domain.as_deref()) {
            Some(domain) if !domain.is_empty() => format!("{domain}\\{}", self.username),
            _ => self.username.clone(),
        }
    }

    /// Check the fields that must never be empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidValue("profile id must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidValue("profile name must not be empty".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(Error::InvalidValue(format!("profile '{}' has no host", self.name)));
        }
        if self.port == 0 {
            return Err(Error::InvalidValue(format!("profile '{}' has port 0", self.name)));
        }
        Ok(())
    }
}
