//! Vault commands: revealing secrets, changing the passphrase, and staging
//! RDP credentials.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use console::style;
use sshmgr_core::SecretField;
use sshmgr_vault::{CmdKeyCache, KdfParams};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

use crate::context::{read_new_passphrase, Context};

/// Arguments for `sshmgr reveal`.
#[derive(Args, Debug)]
pub struct RevealArgs {
    /// Connection id, id prefix, name, or folder/name
    pub id: String,

    /// Which secret to print (password or key-passphrase)
    #[arg(long, default_value = "password")]
    pub field: SecretField,
}

/// Arguments for `sshmgr passwd`.
#[derive(Args, Debug)]
pub struct PasswdArgs {
    /// Remove the passphrase and store secrets as plaintext
    #[arg(long)]
    pub disable: bool,
}

/// Arguments for `sshmgr rdp-cred`.
#[derive(Args, Debug)]
pub struct RdpCredArgs {
    /// Connection id, id prefix, name, or folder/name
    pub id: String,

    /// Seconds before the cached credential is removed
    #[arg(long)]
    pub grace: Option<u64>,

    /// Credential manager executable
    #[arg(long, default_value = "cmdkey.exe", hide = true)]
    pub cmdkey: PathBuf,
}

/// `sshmgr reveal ID [--field FIELD]`
pub async fn reveal(ctx: &mut Context, args: RevealArgs) -> anyhow::Result<()> {
    ctx.unlock().await?;
    let id = ctx.resolve(&args.id)?.id.clone();

    let handle = ctx.manager.reveal_field(&ctx.file.registry, &id, args.field)?;
    handle.with_secret(|secret| println!("{secret}"))?;
    handle.complete();

    ctx.file.registry.mark_used(&id, Utc::now())?;
    ctx.save()?;
    Ok(())
}

/// `sshmgr passwd [--disable]`
pub async fn passwd(ctx: &mut Context, args: PasswdArgs) -> anyhow::Result<()> {
    if args.disable && !ctx.file.header.encryption_enabled {
        println!("Encryption is already disabled.");
        return Ok(());
    }

    ctx.unlock().await?;
    let new_passphrase = if args.disable {
        None
    } else {
        Some(read_new_passphrase()?)
    };

    let params = KdfParams::from_config(&ctx.config.vault);
    ctx.manager.change_passphrase(
        &mut ctx.file.header,
        &mut ctx.file.registry,
        new_passphrase.as_ref().map(|p| p.expose_secret()),
        params,
    )?;
    ctx.save()?;

    if args.disable {
        println!(
            "{} Encryption disabled; secrets are now stored as plaintext.",
            style("!").yellow().bold()
        );
    } else {
        println!("{} Vault passphrase updated.", style("*").green());
    }
    Ok(())
}

/// Run blocking work from async code. On a multi-threaded runtime the
/// worker hands its other tasks off first.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// `sshmgr rdp-cred ID [--grace SECS]`
///
/// Keeps running until the credential has been removed again.
pub async fn rdp_cred(ctx: &mut Context, args: RdpCredArgs) -> anyhow::Result<()> {
    let cache = CmdKeyCache::with_program(&args.cmdkey);
    if !blocking(|| cache.is_available()) {
        anyhow::bail!("{} is not available on this system", args.cmdkey.display());
    }

    ctx.unlock().await?;
    let id = ctx.resolve(&args.id)?.id.clone();
    let grace = args
        .grace
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.vault.rdp_cleanup_grace());

    // cmdkey runs while the revealed password is held.
    let mut handoff = blocking(|| {
        ctx.manager
            .hand_off_rdp(&ctx.file.registry, &id, Arc::new(cache), grace)
    })?;

    // The credential is already staged; a failed save must not skip cleanup.
    ctx.file.registry.mark_used(&id, Utc::now())?;
    if let Err(e) = ctx.save() {
        warn!(error = %e, "failed to record last use");
    }

    println!(
        "Credential for {} staged. It is removed in {}s, or press Ctrl-C to remove it now.",
        style(handoff.target()).bold(),
        grace.as_secs()
    );

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = handoff.finished() => false,
    };
    if interrupted {
        handoff.connection_closed();
        handoff.finished().await;
    }

    println!("Removed cached credential for {}.", handoff.target());
    Ok(())
}
