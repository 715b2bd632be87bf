//! CLI routing tests.
//!
//! Commands are parsed with clap and run in-process against a scratch
//! registry, so no terminal prompts are involved: the registry stays
//! unencrypted and no secrets are requested.

use clap::Parser;
use sshmgr_cli::{run, Cli};
use sshmgr_integration_tests::Scratch;

async fn sshmgr(scratch: &Scratch, args: &[&str]) -> anyhow::Result<()> {
    let registry = scratch.registry_path();
    let mut argv = vec!["sshmgr", "--registry", registry.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    run(cli, scratch.config()).await
}

#[tokio::test]
async fn test_cli_version() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["version"]).await.unwrap();
    assert!(!scratch.registry_path().exists());
}

#[tokio::test]
async fn test_cli_add_list_show() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["add", "web", "--host", "10.0.0.1", "--folder", "prod"])
        .await
        .unwrap();

    sshmgr(&scratch, &["list"]).await.unwrap();
    sshmgr(&scratch, &["list", "prod"]).await.unwrap();
    sshmgr(&scratch, &["show", "prod/web"]).await.unwrap();
    sshmgr(&scratch, &["search", "10.0"]).await.unwrap();

    let file = scratch.store().load().unwrap();
    assert_eq!(file.registry.len(), 1);
    assert_eq!(file.registry.profiles()[0].host, "10.0.0.1");
}

#[tokio::test]
async fn test_cli_duplicate_add_fails() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["add", "web", "--host", "10.0.0.1"]).await.unwrap();
    let result = sshmgr(&scratch, &["add", "web", "--host", "10.0.0.2"]).await;
    assert!(result.is_err());
    assert_eq!(scratch.store().load().unwrap().registry.len(), 1);
}

#[tokio::test]
async fn test_cli_folders_and_move() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["folder", "add", "prod/web"]).await.unwrap();
    sshmgr(&scratch, &["add", "api", "--host", "10.0.0.5"]).await.unwrap();
    sshmgr(&scratch, &["move", "api", "prod/web"]).await.unwrap();

    // Not empty any more.
    assert!(sshmgr(&scratch, &["folder", "remove", "prod/web"]).await.is_err());

    sshmgr(&scratch, &["move", "prod/web/api", "/"]).await.unwrap();
    sshmgr(&scratch, &["folder", "remove", "prod/web"]).await.unwrap();
    sshmgr(&scratch, &["folder", "remove", "prod"]).await.unwrap();

    let file = scratch.store().load().unwrap();
    assert_eq!(file.registry.folders().count(), 0);
    assert!(file.registry.profiles()[0].folder.is_root());
}

#[tokio::test]
async fn test_cli_edit_and_remove() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["add", "web", "--host", "10.0.0.1"]).await.unwrap();
    sshmgr(&scratch, &["edit", "web", "--port", "2222", "--user", "ops"])
        .await
        .unwrap();

    let file = scratch.store().load().unwrap();
    let profile = &file.registry.profiles()[0];
    assert_eq!((profile.port, profile.username.as_str()), (2222, "ops"));

    sshmgr(&scratch, &["remove", "web"]).await.unwrap();
    assert!(scratch.store().load().unwrap().registry.is_empty());
}

#[tokio::test]
async fn test_cli_unknown_connection() {
    let scratch = Scratch::new();
    assert!(sshmgr(&scratch, &["show", "nope"]).await.is_err());
    assert!(sshmgr(&scratch, &["remove", "nope"]).await.is_err());
}

#[tokio::test]
async fn test_cli_reveal_without_secret() {
    let scratch = Scratch::new();
    sshmgr(&scratch, &["add", "web", "--host", "10.0.0.1"]).await.unwrap();
    let err = sshmgr(&scratch, &["reveal", "web"]).await.unwrap_err();
    assert!(err.to_string().contains("no stored password"));
}

#[tokio::test]
async fn test_cli_rejects_rdp_options_for_ssh() {
    let scratch = Scratch::new();
    let result = sshmgr(&scratch, &["add", "web", "--host", "h", "--domain", "CORP"]).await;
    assert!(result.is_err());
    assert!(!scratch.registry_path().exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_rdp_cred_stages_and_removes() {
    use sshmgr_core::{ConnectionProfile, SecretValue};
    use sshmgr_vault::VaultFile;

    let scratch = Scratch::new();
    let mut file = VaultFile::default();
    file.registry
        .create(ConnectionProfile::rdp("desk", "10.0.0.2").with_secret(SecretValue::plain("rdp-pass")))
        .unwrap();
    scratch.store().save(&file).unwrap();

    sshmgr(&scratch, &["rdp-cred", "desk", "--grace", "0", "--cmdkey", "true"])
        .await
        .unwrap();

    let file = scratch.store().load().unwrap();
    assert!(file.registry.profiles()[0].last_used.is_some());
}

#[tokio::test]
async fn test_cli_rdp_cred_without_cmdkey() {
    let scratch = Scratch::new();
    let result = sshmgr(
        &scratch,
        &["rdp-cred", "desk", "--cmdkey", "/nonexistent/sshmgr-cmdkey"],
    )
    .await;
    assert!(result.unwrap_err().to_string().contains("not available"));
}

#[test]
fn test_cli_unknown_command() {
    assert!(Cli::try_parse_from(["sshmgr", "nonexistent-command"]).is_err());
}
