//! Folder paths.
//!
//! Folders are identified by their path from the implicit root, so the
//! hierarchy cannot contain cycles and needs no parent links.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separator used in the textual form of a folder path.
pub const FOLDER_SEPARATOR: char = '/';

/// An ordered sequence of folder names. The empty path is the root.
///
/// Ordering is segment-wise, so `a` sorts before `a/b` which sorts before `b`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    /// The root folder.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from individual folder names.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for segment in segments {
            let segment = segment.into();
            let trimmed = segment.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidFolder("folder names must not be empty".to_string()));
            }
            if trimmed.contains(FOLDER_SEPARATOR) {
                return Err(Error::InvalidFolder(format!(
                    "folder name '{trimmed}' must not contain '{FOLDER_SEPARATOR}'"
                )));
            }
            out.push(trimmed.to_string());
        }
        Ok(Self(out))
    }

    /// Parse `a/b/c`. Leading, trailing, and doubled separators are ignored.
    pub fn parse(s: &str) -> Result<Self, Error> {
        Self::from_segments(
            s.split(FOLDER_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Last folder name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<FolderPath> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Child path with one more segment.
    pub fn child(&self, name: &str) -> Result<FolderPath, Error> {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self::from_segments(segments)
    }

    /// Every non-root prefix of this path, shortest first, ending with `self`.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = FolderPath> + '_ {
        (1..=self.0.len()).map(move |len| Self(self.0[..len].to_vec()))
    }

    /// True when `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &FolderPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for FolderPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FolderPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.join("/"))
    }
}

impl<'de> Deserialize<'de> for FolderPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
