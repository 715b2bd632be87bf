//! End-to-end vault tests: profiles with secrets are saved, reloaded,
//! unlocked, and revealed through the public API only.

use std::fs;

use sshmgr_core::{ConnectionProfile, FolderPath, SecretField, SecretValue, SshAuth};
use sshmgr_integration_tests::{fast_kdf, Scratch};
use sshmgr_vault::{codec, CredentialManager, VaultError, VaultFile, VaultHeader};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(30);

/// An encrypted registry with one SSH profile whose password is "hunter2".
fn encrypted_vault(scratch: &Scratch) -> String {
    let (header, key) = VaultHeader::encrypted("correct", fast_kdf()).unwrap();
    let mut file = VaultFile {
        header,
        ..VaultFile::default()
    };

    let mut profile = ConnectionProfile::ssh("web", "10.0.0.1")
        .with_username("deploy")
        .in_folder(FolderPath::parse("prod").unwrap())
        .with_secret(codec::wrap("hunter2", Some(&key)).unwrap());
    profile.ssh_options_mut().unwrap().auth = SshAuth::Password;
    let id = file.registry.create(profile).unwrap().id.clone();

    scratch.store().save(&file).unwrap();
    id
}

#[test]
fn test_reveal_after_reload() {
    let scratch = Scratch::new();
    let id = encrypted_vault(&scratch);

    let file = scratch.store().load().unwrap();
    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&file.header, "correct").unwrap();

    let first = manager.reveal(&file.registry, &id).unwrap();
    let first_plaintext = first.with_secret(str::to_string).unwrap();
    assert_eq!(first_plaintext, "hunter2");
    drop(first);

    let second = manager.reveal(&file.registry, &id).unwrap();
    assert_eq!(second.with_secret(str::to_string).unwrap(), first_plaintext);
}

#[test]
fn test_lock_then_reveal_fails() {
    let scratch = Scratch::new();
    let id = encrypted_vault(&scratch);
    let file = scratch.store().load().unwrap();

    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&file.header, "correct").unwrap();
    manager.lock();

    assert!(matches!(
        manager.reveal(&file.registry, &id),
        Err(VaultError::VaultLocked)
    ));
}

#[test]
fn test_wrong_passphrase_after_reload() {
    let scratch = Scratch::new();
    encrypted_vault(&scratch);
    let file = scratch.store().load().unwrap();

    let mut manager = CredentialManager::new(TTL);
    assert!(matches!(
        manager.unlock(&file.header, "incorrect"),
        Err(VaultError::InvalidPassphrase)
    ));
}

#[test]
fn test_secrets_are_not_on_disk_in_plaintext() {
    let scratch = Scratch::new();
    encrypted_vault(&scratch);

    let raw = fs::read_to_string(scratch.registry_path()).unwrap();
    assert!(!raw.contains("hunter2"));
    // Names and hosts stay readable so the registry can be browsed while locked.
    assert!(raw.contains("\"web\""));
    assert!(raw.contains("10.0.0.1"));
}

#[test]
fn test_unencrypted_vault_is_human_readable() {
    let scratch = Scratch::new();
    let mut file = VaultFile::default();
    let wrapped = codec::wrap("hunter2", None).unwrap();
    assert_eq!(codec::unwrap(&wrapped, None).unwrap().expose_secret(), "hunter2");

    let id = file
        .registry
        .create(ConnectionProfile::rdp("desk", "10.0.0.2").with_secret(wrapped))
        .unwrap()
        .id
        .clone();
    scratch.store().save(&file).unwrap();

    let raw = fs::read_to_string(scratch.registry_path()).unwrap();
    assert!(raw.contains("hunter2"));
    assert!(!raw.contains("ciphertext"));

    let loaded = scratch.store().load().unwrap();
    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&loaded.header, "").unwrap();
    let handle = manager.reveal(&loaded.registry, &id).unwrap();
    assert_eq!(handle.with_secret(str::to_string).unwrap(), "hunter2");
}

#[test]
fn test_duplicate_name_leaves_registry_and_file_unchanged() {
    let scratch = Scratch::new();
    encrypted_vault(&scratch);
    let before_bytes = fs::read(scratch.registry_path()).unwrap();

    let mut file = scratch.store().load().unwrap();
    let before = file.registry.clone();
    let clash = ConnectionProfile::ssh("web", "10.9.9.9").in_folder(FolderPath::parse("prod").unwrap());

    assert!(matches!(
        file.registry.create(clash),
        Err(VaultError::DuplicateName { .. })
    ));
    assert_eq!(file.registry, before);
    assert_eq!(fs::read(scratch.registry_path()).unwrap(), before_bytes);
}

#[test]
fn test_interrupted_save_keeps_previous_state() {
    let scratch = Scratch::new();
    encrypted_vault(&scratch);
    let store = scratch.store();
    let original = store.load().unwrap();

    let mut changed = original.clone();
    changed
        .registry
        .create(ConnectionProfile::ssh("db", "10.0.0.3"))
        .unwrap();

    // Occupy the temp path so the write fails before the rename.
    fs::create_dir(store.temp_path()).unwrap();
    assert!(matches!(
        store.save(&changed),
        Err(VaultError::Persistence { .. })
    ));

    assert_eq!(store.load().unwrap(), original);
}

#[test]
fn test_passphrase_change_survives_reload() {
    let scratch = Scratch::new();
    let id = encrypted_vault(&scratch);
    let store = scratch.store();
    let mut file = store.load().unwrap();

    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&file.header, "correct").unwrap();
    manager
        .change_passphrase(&mut file.header, &mut file.registry, Some("rotated"), fast_kdf())
        .unwrap();
    store.save(&file).unwrap();
    drop(manager);

    let reloaded = store.load().unwrap();
    let mut manager = CredentialManager::new(TTL);
    assert!(matches!(
        manager.unlock(&reloaded.header, "correct"),
        Err(VaultError::InvalidPassphrase)
    ));
    manager.unlock(&reloaded.header, "rotated").unwrap();
    let handle = manager.reveal(&reloaded.registry, &id).unwrap();
    assert_eq!(handle.with_secret(str::to_string).unwrap(), "hunter2");
}

#[test]
fn test_enable_encryption_on_plain_vault() {
    let scratch = Scratch::new();
    let store = scratch.store();
    let mut file = VaultFile::default();
    let mut profile = ConnectionProfile::ssh("web", "10.0.0.1");
    profile.ssh_options_mut().unwrap().key_passphrase = Some(SecretValue::plain("keypass"));
    let id = file.registry.create(profile).unwrap().id.clone();

    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&file.header, "").unwrap();
    manager
        .change_passphrase(&mut file.header, &mut file.registry, Some("fresh"), fast_kdf())
        .unwrap();
    store.save(&file).unwrap();

    let raw = fs::read_to_string(scratch.registry_path()).unwrap();
    assert!(!raw.contains("keypass"));

    let reloaded = store.load().unwrap();
    let mut manager = CredentialManager::new(TTL);
    manager.unlock(&reloaded.header, "fresh").unwrap();
    let handle = manager
        .reveal_field(&reloaded.registry, &id, SecretField::KeyPassphrase)
        .unwrap();
    assert_eq!(handle.with_secret(str::to_string).unwrap(), "keypass");
}

#[test]
fn test_search_is_restartable() {
    let scratch = Scratch::new();
    encrypted_vault(&scratch);
    let mut file = scratch.store().load().unwrap();
    file.registry
        .create(ConnectionProfile::ssh("web-2", "10.0.1.1"))
        .unwrap();
    file.registry
        .create(ConnectionProfile::ssh("db", "192.168.0.1"))
        .unwrap();

    let search = file.registry.search("WEB");
    let first: Vec<_> = search.clone().map(|p| p.name.clone()).collect();
    let second: Vec<_> = search.map(|p| p.name.clone()).collect();
    assert_eq!(first, second);
    // Root folder sorts before "prod".
    assert_eq!(first, vec!["web-2".to_string(), "web".to_string()]);
}
