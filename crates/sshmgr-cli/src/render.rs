//! Terminal rendering of connections and folders.

use console::style;
use sshmgr_core::{ConnectionProfile, FolderPath, ProtocolOptions, SecretField, SecretValue, SshAuth};

/// Length of the id prefix shown in tables.
const SHORT_ID_LEN: usize = 8;

/// `user@host:port`, omitting the user when unset.
pub fn target(profile: &ConnectionProfile) -> String {
    let user = profile.qualified_username();
    if user.is_empty() {
        format!("{}:{}", profile.host, profile.port)
    } else {
        format!("{}@{}:{}", user, profile.host, profile.port)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn secret_state(value: Option<&SecretValue>) -> &'static str {
    match value {
        Some(SecretValue::Sealed(_)) => "stored (encrypted)",
        Some(SecretValue::Plain(_)) => "stored (plaintext)",
        None => "-",
    }
}

/// One table row for `profile`.
pub fn profile_row(profile: &ConnectionProfile) -> String {
    format!(
        "{:<10} {:<24} {:<5} {:<32} {}",
        short_id(&profile.id),
        profile.name,
        profile.kind().to_string(),
        target(profile),
        profile.folder,
    )
}

/// Print a table of profiles.
pub fn print_profiles<'a>(profiles: impl IntoIterator<Item = &'a ConnectionProfile>) {
    let mut count = 0;
    for profile in profiles {
        if count == 0 {
            println!(
                "{}",
                style(format!(
                    "{:<10} {:<24} {:<5} {:<32} {}",
                    "ID", "NAME", "KIND", "TARGET", "FOLDER"
                ))
                .bold()
            );
        }
        println!("{}", profile_row(profile));
        count += 1;
    }

    if count == 0 {
        println!("No connections found.");
    } else {
        println!("\n{} connection(s).", count);
    }
}

/// Print folder entries, one per line.
pub fn print_folders<'a>(folders: impl IntoIterator<Item = &'a FolderPath>) {
    for folder in folders {
        println!("{} {}/", style("+").cyan(), style(folder).bold());
    }
}

/// Detailed, multi-line description of one profile. Secrets are never shown.
pub fn profile_detail(profile: &ConnectionProfile) -> String {
    let mut lines = vec![
        format!("Name:       {}", profile.name),
        format!("ID:         {}", profile.id),
        format!("Kind:       {}", profile.kind()),
        format!("Host:       {}", profile.host),
        format!("Port:       {}", profile.port),
        format!(
            "User:       {}",
            if profile.username.is_empty() { "-" } else { profile.username.as_str() }
        ),
        format!("Folder:     {}", profile.folder),
    ];

    match &profile.protocol {
        ProtocolOptions::Ssh(opts) => {
            let auth = match opts.auth {
                SshAuth::Password => "password",
                SshAuth::Key => "key",
            };
            lines.push(format!("Auth:       {auth}"));
            if opts.auth == SshAuth::Key {
                lines.push(format!("Key:        {}", opts.resolved_key_path().display()));
                lines.push(format!(
                    "Key pass:   {}",
                    secret_state(profile.secret_field(SecretField::KeyPassphrase))
                ));
            }
        }
        ProtocolOptions::Rdp(opts) => {
            if let Some(domain) = &opts.domain {
                lines.push(format!("Domain:     {domain}"));
            }
            if let Some(resolution) = &opts.resolution {
                lines.push(format!("Resolution: {resolution}"));
            }
            lines.push(format!("Fullscreen: {}", if opts.fullscreen { "yes" } else { "no" }));
        }
    }

    lines.push(format!(
        "Password:   {}",
        secret_state(profile.secret_field(SecretField::Password))
    ));
    lines.push(format!(
        "Last used:  {}",
        profile
            .last_used
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    ));
    lines.join("\n")
}
