//! Connection registry commands.
//!
//! Provides `sshmgr list|search|show|add|edit|remove|move`.

use std::path::PathBuf;

use clap::Args;
use sshmgr_core::{
    ConnectionKind, ConnectionProfile, FolderPath, ProtocolOptions, Resolution, SecretString,
    SshAuth,
};

use crate::context::{prompt_secret, Context};
use crate::render;

/// Protocol options shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub struct ProtocolArgs {
    /// SSH authentication method (password or key)
    #[arg(long)]
    pub auth: Option<SshAuth>,

    /// SSH private key file (default ~/.ssh/id_rsa)
    #[arg(long)]
    pub key_path: Option<PathBuf>,

    /// RDP domain
    #[arg(long)]
    pub domain: Option<String>,

    /// RDP resolution, e.g. 1920x1080
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Start RDP sessions fullscreen
    #[arg(long, conflicts_with = "windowed")]
    pub fullscreen: bool,

    /// Start RDP sessions in a window
    #[arg(long)]
    pub windowed: bool,
}

impl ProtocolArgs {
    fn apply(&self, profile: &mut ConnectionProfile) -> anyhow::Result<()> {
        match &mut profile.protocol {
            ProtocolOptions::Ssh(opts) => {
                if self.domain.is_some() || self.resolution.is_some() || self.fullscreen || self.windowed
                {
                    anyhow::bail!("RDP options given for an SSH connection");
                }
                if let Some(auth) = self.auth {
                    opts.auth = auth;
                }
                if let Some(path) = &self.key_path {
                    opts.key_path = Some(path.clone());
                }
            }
            ProtocolOptions::Rdp(opts) => {
                if self.auth.is_some() || self.key_path.is_some() {
                    anyhow::bail!("SSH options given for an RDP connection");
                }
                if let Some(domain) = &self.domain {
                    opts.domain = Some(domain.clone()).filter(|d| !d.is_empty());
                }
                if let Some(resolution) = self.resolution {
                    opts.resolution = Some(resolution);
                }
                if self.fullscreen {
                    opts.fullscreen = true;
                } else if self.windowed {
                    opts.fullscreen = false;
                }
            }
        }
        Ok(())
    }
}

/// Arguments for `sshmgr add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Connection name (unique within its folder)
    pub name: String,

    /// Host name or address
    #[arg(long)]
    pub host: String,

    /// Connection kind (ssh or rdp)
    #[arg(short, long, default_value = "ssh")]
    pub kind: ConnectionKind,

    /// Port (defaults to 22 for SSH and 3389 for RDP)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Login user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Folder path, e.g. prod/web
    #[arg(short, long)]
    pub folder: Option<FolderPath>,

    #[command(flatten)]
    pub options: ProtocolArgs,

    /// Prompt for a password even if the connection does not need one
    #[arg(long)]
    pub password: bool,

    /// Prompt for the SSH key passphrase
    #[arg(long)]
    pub key_passphrase: bool,
}

/// Arguments for `sshmgr edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Connection id, id prefix, name, or folder/name
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New host
    #[arg(long)]
    pub host: Option<String>,

    /// New port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// New login user (empty to clear)
    #[arg(short, long)]
    pub user: Option<String>,

    #[command(flatten)]
    pub options: ProtocolArgs,

    /// Prompt for a new password
    #[arg(long, conflicts_with = "clear_password")]
    pub password: bool,

    /// Forget the stored password
    #[arg(long)]
    pub clear_password: bool,

    /// Prompt for a new SSH key passphrase
    #[arg(long)]
    pub key_passphrase: bool,
}

/// Whether logging in to `profile` needs a stored password.
fn needs_password(profile: &ConnectionProfile) -> bool {
    match &profile.protocol {
        ProtocolOptions::Ssh(opts) => opts.auth == SshAuth::Password,
        ProtocolOptions::Rdp(_) => true,
    }
}

fn prompt_nonempty(prompt: &str) -> anyhow::Result<Option<SecretString>> {
    let secret = prompt_secret(prompt)?;
    Ok(Some(secret).filter(|s| !s.is_empty()))
}

/// Prompt for and seal the requested secrets of `profile`.
async fn set_secrets(
    ctx: &mut Context,
    profile: &mut ConnectionProfile,
    password: bool,
    key_passphrase: bool,
) -> anyhow::Result<()> {
    if password {
        if let Some(secret) = prompt_nonempty(&format!("Password for '{}': ", profile.name))? {
            profile.secret = Some(ctx.seal(secret.expose_secret()).await?);
        }
    }

    if key_passphrase {
        if profile.kind() != ConnectionKind::Ssh {
            anyhow::bail!("Only SSH connections have a key passphrase");
        }
        let prompt = format!("Key passphrase for '{}': ", profile.name);
        let sealed = match prompt_nonempty(&prompt)? {
            Some(secret) => Some(ctx.seal(secret.expose_secret()).await?),
            None => None,
        };
        if let Some(opts) = profile.ssh_options_mut() {
            opts.key_passphrase = sealed;
        }
    }
    Ok(())
}

/// `sshmgr list [FOLDER]`
pub fn list(ctx: &Context, folder: Option<&FolderPath>) -> anyhow::Result<()> {
    let registry = ctx.registry();
    match folder {
        None => render::print_profiles(registry.profiles()),
        Some(folder) => {
            if !registry.has_folder(folder) {
                anyhow::bail!("Folder not found: {}", folder);
            }
            render::print_folders(registry.subfolders(folder));
            render::print_profiles(registry.list_by_folder(folder));
        }
    }
    Ok(())
}

/// `sshmgr search QUERY`
pub fn search(ctx: &Context, query: &str) -> anyhow::Result<()> {
    render::print_profiles(ctx.registry().search(query));
    Ok(())
}

/// `sshmgr show ID`
pub fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    println!("{}", render::profile_detail(ctx.resolve(id)?));
    Ok(())
}

/// `sshmgr add NAME --host HOST ...`
pub async fn add(ctx: &mut Context, args: AddArgs) -> anyhow::Result<()> {
    let mut profile = match args.kind {
        ConnectionKind::Ssh => ConnectionProfile::ssh(args.name, args.host),
        ConnectionKind::Rdp => ConnectionProfile::rdp(args.name, args.host),
    };
    if let Some(port) = args.port {
        profile = profile.with_port(port);
    }
    if let Some(user) = args.user {
        profile = profile.with_username(user);
    }
    if let Some(folder) = args.folder {
        profile = profile.in_folder(folder);
    }
    args.options.apply(&mut profile)?;

    // Check for clashes before prompting.
    if ctx.registry().find_by_name(&profile.folder, &profile.name).is_some() {
        anyhow::bail!(
            "A connection named '{}' already exists in folder '{}'",
            profile.name,
            profile.folder
        );
    }

    let wants_password = args.password || needs_password(&profile);
    set_secrets(ctx, &mut profile, wants_password, args.key_passphrase).await?;

    let created = ctx.file.registry.create(profile)?;
    let (name, id) = (created.name.clone(), created.id.clone());
    ctx.save()?;

    println!("Added connection '{}' ({}).", name, id);
    Ok(())
}

/// `sshmgr edit ID ...`
pub async fn edit(ctx: &mut Context, args: EditArgs) -> anyhow::Result<()> {
    let mut profile = ctx.resolve(&args.id)?.clone();
    let id = profile.id.clone();

    if let Some(name) = args.name {
        profile.name = name;
    }
    if let Some(host) = args.host {
        profile.host = host;
    }
    if let Some(port) = args.port {
        profile.port = port;
    }
    if let Some(user) = args.user {
        profile.username = user;
    }
    args.options.apply(&mut profile)?;

    if args.clear_password {
        profile.secret = None;
    }
    set_secrets(ctx, &mut profile, args.password, args.key_passphrase).await?;

    ctx.file.registry.update(&id, profile)?;
    ctx.save()?;

    println!("Updated connection '{}'.", id);
    Ok(())
}

/// `sshmgr remove ID`
pub fn remove(ctx: &mut Context, id: &str) -> anyhow::Result<()> {
    let id = ctx.resolve(id)?.id.clone();
    let removed = ctx.file.registry.delete(&id)?;
    ctx.save()?;

    println!("Removed connection '{}' ({}).", removed.name, removed.id);
    Ok(())
}

/// `sshmgr move ID FOLDER`
pub fn move_to(ctx: &mut Context, id: &str, folder: FolderPath) -> anyhow::Result<()> {
    let id = ctx.resolve(id)?.id.clone();
    let moved = ctx.file.registry.move_profile(&id, folder)?;
    let (name, folder) = (moved.name.clone(), moved.folder.clone());
    ctx.save()?;

    println!("Moved '{}' to '{}'.", name, folder);
    Ok(())
}
