//! Folder management commands.

use clap::Args;
use sshmgr_core::FolderPath;

use crate::context::Context;
use crate::render;

/// Folder command arguments.
#[derive(Args)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(clap::Subcommand)]
pub enum FolderCommand {
    /// Create a folder (and any missing parents)
    Add {
        /// Folder path, e.g. prod/web
        path: FolderPath,
    },

    /// Remove an empty folder
    Remove {
        /// Folder path
        path: FolderPath,
    },

    /// List all folders
    List,
}

/// Run the folder command.
pub fn run(ctx: &mut Context, args: FolderArgs) -> anyhow::Result<()> {
    match args.command {
        FolderCommand::Add { path } => {
            if path.is_root() {
                anyhow::bail!("The root folder always exists");
            }
            ctx.file.registry.create_folder(&path);
            ctx.save()?;
            println!("Folder '{}' created.", path);
        }

        FolderCommand::Remove { path } => {
            ctx.file.registry.remove_folder(&path)?;
            ctx.save()?;
            println!("Folder '{}' removed.", path);
        }

        FolderCommand::List => {
            let registry = ctx.registry();
            if registry.folders().next().is_none() {
                println!("No folders.");
            } else {
                render::print_folders(registry.folders());
            }
        }
    }

    Ok(())
}
