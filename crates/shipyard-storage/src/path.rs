//! Storage locations.
//!
//! A [`StoragePath`] is either a plain local path (`/tmp/app.jar`, `lib/a.txt`)
//! or a URI (`hdfs://namenode:8020/user/alice`). Only URIs with a scheme other
//! than `file` are remote.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

const LOCAL_SCHEME: &str = "file";

/// A local or remote location understood by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoragePath {
    scheme: Option<String>,
    authority: String,
    path: String,
}

impl StoragePath {
    /// Parse a path or URI. Trailing slashes are dropped.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        if raw.is_empty() {
            return Err(StorageError::InvalidPath("empty path".to_string()));
        }

        if let Some((scheme, rest)) = raw.split_once("://") {
            if is_valid_scheme(scheme) {
                let (authority, path) = match rest.find('/') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, "/"),
                };
                return Ok(Self {
                    scheme: Some(scheme.to_ascii_lowercase()),
                    authority: authority.to_string(),
                    path: normalize(path),
                });
            }
        }

        // `scheme:/path` and `scheme:path` have no authority. One-letter
        // schemes stay local so `C:` drive paths are not taken for URIs.
        if let Some((scheme, rest)) = raw.split_once(':') {
            if scheme.len() > 1 && is_valid_scheme(scheme) && !rest.is_empty() {
                return Ok(Self {
                    scheme: Some(scheme.to_ascii_lowercase()),
                    authority: String::new(),
                    path: normalize(rest),
                });
            }
        }

        Ok(Self {
            scheme: None,
            authority: String::new(),
            path: normalize(raw),
        })
    }

    /// Build a path from a local filesystem location.
    pub fn from_local(path: &Path) -> Result<Self, StorageError> {
        Self::parse(&path.to_string_lossy())
    }

    /// URI scheme, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// URI authority (empty for plain paths).
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The path component, without scheme or authority.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this location lives outside the local filesystem.
    pub fn is_remote(&self) -> bool {
        matches!(self.scheme.as_deref(), Some(scheme) if scheme != LOCAL_SCHEME)
    }

    fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Final path segment; empty for a root.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// The enclosing location, or `None` for a root or a single relative segment.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let parent = match self.path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => self.path[..idx].to_string(),
            None => return None,
        };
        Some(Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: parent,
        })
    }

    /// Append a relative path. Empty segments are ignored.
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            return self.clone();
        }
        let path = if self.path.ends_with('/') {
            format!("{}{}", self.path, relative)
        } else {
            format!("{}/{}", self.path, relative)
        };
        Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: normalize(&path),
        }
    }

    /// Path of `child` relative to `self`, if `child` lies strictly beneath it.
    pub fn relativize(&self, child: &StoragePath) -> Option<String> {
        if self.scheme != child.scheme || self.authority != child.authority {
            return None;
        }
        let rest = if self.is_root() {
            child.path.strip_prefix('/')?
        } else {
            child.path.strip_prefix(self.path.as_str())?.strip_prefix('/')?
        };
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    /// The local filesystem path, or `None` for a remote location.
    pub fn to_local_path(&self) -> Option<PathBuf> {
        match self.scheme.as_deref() {
            None | Some(LOCAL_SCHEME) => Some(PathBuf::from(&self.path)),
            Some(_) => None,
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) if self.authority.is_empty() && !self.path.starts_with('/') => {
                write!(f, "{}:{}", scheme, self.path)
            }
            Some(scheme) => write!(f, "{}://{}{}", scheme, self.authority, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

impl FromStr for StoragePath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoragePath {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoragePath> for String {
    fn from(value: StoragePath) -> Self {
        value.to_string()
    }
}
