//! Artifact descriptors and resource-manager registration records.

use std::fmt;

use serde::{Deserialize, Serialize};
use shipyard_storage::{FileStatus, StoragePath};

use crate::error::ResourceError;

/// Who may reuse a localized artifact on a worker node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Private to one application.
    Application,
    /// Cacheable across applications on the same node.
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => write!(f, "APPLICATION"),
            Self::Public => write!(f, "PUBLIC"),
        }
    }
}

/// Record handed to the resource manager for one container resource.
///
/// Two registrations are equivalent when their records are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResource {
    pub path: StoragePath,
    pub size: u64,
    /// Milliseconds since the Unix epoch; the node cache is keyed on it.
    pub modification_time: i64,
    pub visibility: Visibility,
}

/// A staged or referenced artifact, addressed by its key in the
/// application's resource namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Unique name within the application's resources.
    pub key: String,
    /// Location in shared storage.
    pub path: StoragePath,
    pub size: u64,
    pub modification_time: i64,
    pub visibility: Visibility,
}

impl ArtifactDescriptor {
    pub fn new(
        key: impl Into<String>,
        path: StoragePath,
        size: u64,
        modification_time: i64,
        visibility: Visibility,
    ) -> Self {
        Self {
            key: key.into(),
            path,
            size,
            modification_time,
            visibility,
        }
    }

    /// Describe an existing storage entry.
    pub fn from_status(
        key: impl Into<String>,
        status: &FileStatus,
        visibility: Visibility,
    ) -> Self {
        Self::new(
            key,
            status.path.clone(),
            status.size,
            status.modification_time,
            visibility,
        )
    }

    /// The registration record for this artifact.
    pub fn to_local_resource(&self) -> LocalResource {
        LocalResource {
            path: self.path.clone(),
            size: self.size,
            modification_time: self.modification_time,
            visibility: self.visibility,
        }
    }

    pub fn to_json(&self) -> Result<String, ResourceError> {
        serde_json::to_string(self).map_err(ResourceError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(json).map_err(ResourceError::Decode)
    }
}

/// Encode the shipped descriptors for a container environment variable.
pub fn encode_ship_list(descriptors: &[ArtifactDescriptor]) -> Result<String, ResourceError> {
    serde_json::to_string(descriptors).map_err(ResourceError::Encode)
}

/// Inverse of [`encode_ship_list`]. An empty string decodes to no descriptors.
pub fn decode_ship_list(encoded: &str) -> Result<Vec<ArtifactDescriptor>, ResourceError> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(encoded).map_err(ResourceError::Decode)
}
