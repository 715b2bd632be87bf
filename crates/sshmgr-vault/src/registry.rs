//! In-memory connection registry.
//!
//! Holds the folder tree and every connection profile. All mutations work on
//! this snapshot only; persisting requires an explicit
//! [`RecordStore::save`](crate::store::RecordStore::save).
//!
//! Profiles are kept sorted by folder path then name, which gives listings
//! and searches their order without re-sorting on every read.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sshmgr_core::{ConnectionProfile, FolderPath};
use tracing::debug;

use crate::error::{Result, VaultError};

/// Shortest id prefix accepted by [`Registry::resolve`].
const MIN_ID_PREFIX: usize = 4;

/// The folders and connection profiles of one registry file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    folders: BTreeSet<FolderPath>,
    profiles: Vec<ConnectionProfile>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted parts, checking its invariants.
    pub fn from_parts(
        folders: impl IntoIterator<Item = FolderPath>,
        profiles: impl IntoIterator<Item = ConnectionProfile>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for folder in folders {
            registry.create_folder(&folder);
        }
        for profile in profiles {
            registry.create(profile)?;
        }
        Ok(registry)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.folders.is_empty()
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// All profiles, ordered by folder path then name.
    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    /// All declared folders in path order (the root is implicit).
    pub fn folders(&self) -> impl Iterator<Item = &FolderPath> {
        self.folders.iter()
    }

    pub fn has_folder(&self, path: &FolderPath) -> bool {
        path.is_root() || self.folders.contains(path)
    }

    /// Direct children of `path`.
    pub fn subfolders<'a>(&'a self, path: &'a FolderPath) -> impl Iterator<Item = &'a FolderPath> {
        self.folders
            .iter()
            .filter(move |f| f.depth() == path.depth() + 1 && f.starts_with(path))
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Profile with exactly this name in `folder`.
    pub fn find_by_name(&self, folder: &FolderPath, name: &str) -> Option<&ConnectionProfile> {
        self.profiles
            .iter()
            .find(|p| &p.folder == folder && p.name == name)
    }

    /// Look a profile up by id, unique id prefix, `folder/name`, or unique name.
    pub fn resolve(&self, query: &str) -> Result<&ConnectionProfile> {
        if let Some(profile) = self.get(query) {
            return Ok(profile);
        }

        if query.len() >= MIN_ID_PREFIX && sshmgr_core::id::is_id_like(query) {
            let mut by_prefix = self.profiles.iter().filter(|p| p.id.starts_with(query));
            if let Some(first) = by_prefix.next() {
                if by_prefix.next().is_some() {
                    return Err(VaultError::Ambiguous(query.to_string()));
                }
                return Ok(first);
            }
        }

        if let Some((folder, name)) = query.rsplit_once(sshmgr_core::FOLDER_SEPARATOR) {
            if let Ok(folder) = FolderPath::parse(folder) {
                if let Some(profile) = self.find_by_name(&folder, name) {
                    return Ok(profile);
                }
            }
        }

        let mut by_name = self.profiles.iter().filter(|p| p.name == query);
        match (by_name.next(), by_name.next()) {
            (Some(profile), None) => Ok(profile),
            (Some(_), Some(_)) => Err(VaultError::Ambiguous(query.to_string())),
            _ => Err(VaultError::NotFound(query.to_string())),
        }
    }

    /// Ensure `name` is free in `folder`, ignoring the profile `except_id`.
    fn check_name_free(
        &self,
        folder: &FolderPath,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<()> {
        let taken = self.profiles.iter().any(|p| {
            &p.folder == folder && p.name == name && Some(p.id.as_str()) != except_id
        });
        if taken {
            return Err(VaultError::DuplicateName {
                name: name.to_string(),
                folder: folder.to_string(),
            });
        }
        Ok(())
    }

    fn sort(&mut self) {
        self.profiles.sort_by(|a, b| {
            a.folder
                .cmp(&b.folder)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Add a new profile. Its folder (and every ancestor) is declared.
    pub fn create(&mut self, profile: ConnectionProfile) -> Result<&ConnectionProfile> {
        profile.validate()?;
        if self.get(&profile.id).is_some() {
            return Err(VaultError::DuplicateId(profile.id));
        }
        self.check_name_free(&profile.folder, &profile.name, None)?;

        debug!(id = %profile.id, name = %profile.name, folder = %profile.folder, "creating connection");
        let id = profile.id.clone();
        self.create_folder(&profile.folder);
        self.profiles.push(profile);
        self.sort();
        self.get(&id).ok_or(VaultError::NotFound(id))
    }

    /// Replace the profile `id`. The stored id is kept even if `profile.id` differs.
    pub fn update(&mut self, id: &str, mut profile: ConnectionProfile) -> Result<&ConnectionProfile> {
        let idx = self.position(id)?;
        profile.id = id.to_string();
        profile.validate()?;
        self.check_name_free(&profile.folder, &profile.name, Some(id))?;

        debug!(id, name = %profile.name, "updating connection");
        self.create_folder(&profile.folder);
        self.profiles[idx] = profile;
        self.sort();
        self.get(id).ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Remove and return the profile `id`.
    pub fn delete(&mut self, id: &str) -> Result<ConnectionProfile> {
        let idx = self.position(id)?;
        debug!(id, "deleting connection");
        Ok(self.profiles.remove(idx))
    }

    /// Move the profile `id` into `folder`.
    pub fn move_profile(&mut self, id: &str, folder: FolderPath) -> Result<&ConnectionProfile> {
        let idx = self.position(id)?;
        let name = self.profiles[idx].name.clone();
        self.check_name_free(&folder, &name, Some(id))?;

        debug!(id, to = %folder, "moving connection");
        self.create_folder(&folder);
        self.profiles[idx].folder = folder;
        self.sort();
        self.get(id).ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Profiles directly inside `folder`, ordered by name.
    pub fn list_by_folder(&self, folder: &FolderPath) -> Vec<&ConnectionProfile> {
        self.profiles.iter().filter(|p| &p.folder == folder).collect()
    }

    /// Case-insensitive substring search over name and host.
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn search(&self, query: &str) -> Search<'_> {
        Search {
            inner: self.profiles.iter(),
            needle: query.to_lowercase(),
        }
    }

    /// Record that the profile was just used.
    pub fn mark_used(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let idx = self.position(id)?;
        self.profiles[idx].last_used = Some(at);
        Ok(())
    }

    /// Declare `path` and all of its ancestors. Declaring the root is a no-op.
    pub fn create_folder(&mut self, path: &FolderPath) {
        for folder in path.ancestors_and_self() {
            self.folders.insert(folder);
        }
    }

    /// Remove an empty folder.
    pub fn remove_folder(&mut self, path: &FolderPath) -> Result<()> {
        if path.is_root() {
            let err = sshmgr_core::Error::InvalidFolder("the root folder cannot be removed".into());
            return Err(err.into());
        }
        if !self.folders.contains(path) {
            return Err(VaultError::FolderNotFound(path.to_string()));
        }
        let has_profiles = self.profiles.iter().any(|p| p.folder.starts_with(path));
        let has_children = self.folders.iter().any(|f| f != path && f.starts_with(path));
        if has_profiles || has_children {
            return Err(VaultError::FolderNotEmpty(path.to_string()));
        }
        self.folders.remove(path);
        Ok(())
    }

    /// Mutable access for re-keying. Only secret fields may be changed
    /// through this, since ordering and uniqueness are not re-checked.
    pub(crate) fn profiles_mut(&mut self) -> impl Iterator<Item = &mut ConnectionProfile> {
        self.profiles.iter_mut()
    }
}

/// Lazy search over a registry. See [`Registry::search`].
#[derive(Debug, Clone)]
pub struct Search<'a> {
    inner: std::slice::Iter<'a, ConnectionProfile>,
    needle: String,
}

impl<'a> Iterator for Search<'a> {
    type Item = &'a ConnectionProfile;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = &self.needle;
        self.inner.find(|p| p.matches_lowercase(needle))
    }
}
