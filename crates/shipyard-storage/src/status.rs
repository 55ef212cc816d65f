//! File metadata as reported by storage.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::StoragePath;

/// Metadata for a single file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Where the entry lives.
    pub path: StoragePath,
    /// Length in bytes (0 for directories).
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub modification_time: i64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl FileStatus {
    /// Status of a regular file.
    pub fn file(path: StoragePath, size: u64, modification_time: i64) -> Self {
        Self {
            path,
            size,
            modification_time,
            is_dir: false,
        }
    }

    /// Final segment of the path.
    pub fn name(&self) -> &str {
        self.path.name()
    }
}

/// Convert a filesystem timestamp into epoch milliseconds.
pub fn epoch_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// POSIX permission bits applied when creating directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission(pub u32);

impl Permission {
    /// `rwx------`
    pub const OWNER_ONLY: Permission = Permission(0o700);

    pub fn mode(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.0)
    }
}
