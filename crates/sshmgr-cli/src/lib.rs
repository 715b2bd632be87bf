//! sshmgr command-line interface.

pub mod commands;
pub mod context;
pub mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sshmgr_core::config::Config;

use crate::context::Context;

/// sshmgr - SSH and RDP connection manager with an encrypted credential vault
#[derive(Parser)]
#[command(name = "sshmgr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "SSHMGR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the registry file
    #[arg(short, long, env = "SSHMGR_REGISTRY")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List connections, optionally only those in one folder
    List {
        /// Folder path (e.g. prod/web)
        folder: Option<sshmgr_core::FolderPath>,
    },

    /// Search connections by name or host
    Search {
        /// Case-insensitive substring
        query: String,
    },

    /// Show one connection
    Show {
        /// Connection id, id prefix, name, or folder/name
        id: String,
    },

    /// Add a connection
    Add(commands::profiles::AddArgs),

    /// Change a connection
    Edit(commands::profiles::EditArgs),

    /// Remove a connection
    Remove {
        /// Connection id, id prefix, name, or folder/name
        id: String,
    },

    /// Move a connection to another folder
    Move {
        /// Connection id, id prefix, name, or folder/name
        id: String,

        /// Destination folder ("/" for the root)
        folder: sshmgr_core::FolderPath,
    },

    /// Manage folders
    Folder(commands::folder::FolderArgs),

    /// Print a stored secret
    Reveal(commands::vault::RevealArgs),

    /// Set, change, or remove the vault passphrase
    Passwd(commands::vault::PasswdArgs),

    /// Stage an RDP password in the Windows credential manager
    RdpCred(commands::vault::RdpCredArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load the config from `path`, or from the default location.
///
/// A missing file means defaults. An unreadable or invalid file is reported
/// and replaced by defaults. This runs before logging is set up, so the
/// warning goes straight to stderr.
pub fn load_config(path: Option<&Path>) -> Config {
    match Config::load_checked(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} ignoring config file: {e}",
                console::style("!").yellow().bold()
            );
            Config::default()
        }
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref(), &config),
        Commands::Version => {
            println!("sshmgr {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let mut ctx = Context::open(config, cli.registry)?;
            let result = dispatch(command, &mut ctx).await;
            ctx.close();
            result
        }
    }
}

async fn dispatch(command: Commands, ctx: &mut Context) -> anyhow::Result<()> {
    use commands::{folder, profiles, vault};

    match command {
        Commands::List { folder } => profiles::list(ctx, folder.as_ref()),
        Commands::Search { query } => profiles::search(ctx, &query),
        Commands::Show { id } => profiles::show(ctx, &id),
        Commands::Add(args) => profiles::add(ctx, args).await,
        Commands::Edit(args) => profiles::edit(ctx, args).await,
        Commands::Remove { id } => profiles::remove(ctx, &id),
        Commands::Move { id, folder } => profiles::move_to(ctx, &id, folder),
        Commands::Folder(args) => folder::run(ctx, args),
        Commands::Reveal(args) => vault::reveal(ctx, args).await,
        Commands::Passwd(args) => vault::passwd(ctx, args).await,
        Commands::RdpCred(args) => vault::rdp_cred(ctx, args).await,
        Commands::Config(_) | Commands::Version => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sshmgr_core::{ConnectionKind, FolderPath, SecretField, SshAuth};

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["sshmgr", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_parse_list_folder() {
        let cli = Cli::try_parse_from(["sshmgr", "list", "prod/web"]).unwrap();
        match cli.command {
            Commands::List { folder } => {
                assert_eq!(folder, Some(FolderPath::parse("prod/web").unwrap()));
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_parse_list_all() {
        let cli = Cli::try_parse_from(["sshmgr", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { folder: None }));
    }

    #[test]
    fn test_parse_add_ssh() {
        let cli = Cli::try_parse_from([
            "sshmgr",
            "add",
            "web",
            "--host",
            "10.0.0.1",
            "--user",
            "deploy",
            "--folder",
            "prod",
            "--auth",
            "password",
        ])
        .unwrap();
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.name, "web");
                assert_eq!(args.host, "10.0.0.1");
                assert_eq!(args.kind, ConnectionKind::Ssh);
                assert_eq!(args.user.as_deref(), Some("deploy"));
                assert_eq!(args.folder, Some(FolderPath::parse("prod").unwrap()));
                assert_eq!(args.options.auth, Some(SshAuth::Password));
                assert!(args.port.is_none());
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_parse_add_rdp() {
        let cli = Cli::try_parse_from([
            "sshmgr",
            "add",
            "desk",
            "--host",
            "10.0.0.2",
            "--kind",
            "rdp",
            "--domain",
            "CORP",
            "--resolution",
            "1920x1080",
        ])
        .unwrap();
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.kind, ConnectionKind::Rdp);
                assert_eq!(args.options.domain.as_deref(), Some("CORP"));
                let resolution = args.options.resolution.unwrap();
                assert_eq!((resolution.width, resolution.height), (1920, 1080));
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_parse_add_rejects_bad_resolution() {
        let result = Cli::try_parse_from([
            "sshmgr",
            "add",
            "desk",
            "--host",
            "h",
            "--resolution",
            "wide",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_edit() {
        let cli =
            Cli::try_parse_from(["sshmgr", "edit", "web", "--port", "2222", "--clear-password"])
                .unwrap();
        match cli.command {
            Commands::Edit(args) => {
                assert_eq!(args.id, "web");
                assert_eq!(args.port, Some(2222));
                assert!(args.clear_password);
                assert!(!args.password);
            }
            _ => panic!("Expected Edit command"),
        }
    }

    #[test]
    fn test_parse_move_to_root() {
        let cli = Cli::try_parse_from(["sshmgr", "move", "web", "/"]).unwrap();
        match cli.command {
            Commands::Move { id, folder } => {
                assert_eq!(id, "web");
                assert!(folder.is_root());
            }
            _ => panic!("Expected Move command"),
        }
    }

    #[test]
    fn test_parse_folder_remove() {
        let cli = Cli::try_parse_from(["sshmgr", "folder", "remove", "prod/old"]).unwrap();
        match cli.command {
            Commands::Folder(args) => match args.command {
                commands::folder::FolderCommand::Remove { path } => {
                    assert_eq!(path.to_string(), "prod/old");
                }
                _ => panic!("Expected Folder Remove command"),
            },
            _ => panic!("Expected Folder command"),
        }
    }

    #[test]
    fn test_parse_reveal_field() {
        let cli =
            Cli::try_parse_from(["sshmgr", "reveal", "web", "--field", "key-passphrase"]).unwrap();
        match cli.command {
            Commands::Reveal(args) => {
                assert_eq!(args.id, "web");
                assert_eq!(args.field, SecretField::KeyPassphrase);
            }
            _ => panic!("Expected Reveal command"),
        }
    }

    #[test]
    fn test_parse_reveal_default_field() {
        let cli = Cli::try_parse_from(["sshmgr", "reveal", "web"]).unwrap();
        match cli.command {
            Commands::Reveal(args) => assert_eq!(args.field, SecretField::Password),
            _ => panic!("Expected Reveal command"),
        }
    }

    #[test]
    fn test_parse_passwd_disable() {
        let cli = Cli::try_parse_from(["sshmgr", "passwd", "--disable"]).unwrap();
        match cli.command {
            Commands::Passwd(args) => assert!(args.disable),
            _ => panic!("Expected Passwd command"),
        }
    }

    #[test]
    fn test_parse_rdp_cred_grace() {
        let cli = Cli::try_parse_from(["sshmgr", "rdp-cred", "desk", "--grace", "5"]).unwrap();
        match cli.command {
            Commands::RdpCred(args) => {
                assert_eq!(args.id, "desk");
                assert_eq!(args.grace, Some(5));
            }
            _ => panic!("Expected RdpCred command"),
        }
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["sshmgr", "config", "validate"]).unwrap();
        match cli.command {
            Commands::Config(args) => {
                assert!(matches!(args.command, commands::config::ConfigCommand::Validate));
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_global_registry_flag() {
        let cli =
            Cli::try_parse_from(["sshmgr", "-r", "/tmp/reg.json", "-vv", "search", "db"]).unwrap();
        assert_eq!(cli.registry, Some(PathBuf::from("/tmp/reg.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("nope.json5")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json5");
        std::fs::write(&path, "{ vault: { reveal_ttl_secs: 5 } }").unwrap();
        assert_eq!(load_config(Some(&path)).vault.reveal_ttl_secs, 5);
    }

    #[test]
    fn test_load_config_invalid_values_use_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json5");
        std::fs::write(
            &path,
            "{ vault: { reveal_ttl_secs: 0, rdp_cleanup_grace_secs: 0 } }",
        )
        .unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config, Config::default());
        assert!(config.vault.reveal_ttl_secs > 0);
        assert!(config.vault.rdp_cleanup_grace_secs > 0);
    }

    #[test]
    fn test_load_config_unparseable_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json5");
        std::fs::write(&path, "{ vault: ").unwrap();
        assert_eq!(load_config(Some(&path)), Config::default());
    }
}
