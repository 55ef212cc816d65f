//! Staging manifest (staging_manifest.json)
//!
//! Records what a submission staged. `manifest_sha256` binds the staging
//! outcome through its JCS encoding, so two submissions of the same inputs
//! compare equal by digest even though `created_at` differs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shipyard_resource::ArtifactDescriptor;
use shipyard_storage::StoragePath;
use std::fs;
use std::io;
use std::path::Path;

use crate::application::ApplicationId;
use crate::registrar::ResourceTable;

/// Schema version for staging_manifest.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "shipyard/staging_manifest@1";

/// Errors for staging manifest operations
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JCS canonicalization error: {0}")]
    Jcs(String),

    #[error("manifest digest mismatch: recorded {recorded}, computed {computed}")]
    DigestMismatch { recorded: String, computed: String },
}

/// Everything one submission staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingOutcome {
    pub application_id: ApplicationId,

    /// `<home>/.<namespace>/<application id>`
    pub application_dir: StoragePath,

    /// Shared libraries, in index order
    pub provided_classpath: Vec<String>,

    /// User classpath: resource directories, then archives
    pub classpath: Vec<String>,

    /// Descriptors of every shipped file, shared shadows included
    pub shipped: Vec<ArtifactDescriptor>,

    pub remote_paths: Vec<StoragePath>,

    /// Private resource table handed to the resource manager
    pub resources: ResourceTable,
}

/// Staging manifest (staging_manifest.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingManifest {
    pub schema_version: u32,

    pub schema_id: String,

    /// When the manifest was created; not covered by the digest
    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub outcome: StagingOutcome,

    /// SHA-256 of JCS(outcome)
    pub manifest_sha256: String,
}

impl StagingManifest {
    pub fn new(outcome: StagingOutcome) -> Result<Self, ManifestError> {
        let manifest_sha256 = Self::compute_sha256(&outcome)?;
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            outcome,
            manifest_sha256,
        })
    }

    /// Compute the digest of an outcome using JCS
    pub fn compute_sha256(outcome: &StagingOutcome) -> Result<String, ManifestError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(outcome)
            .map_err(|e| ManifestError::Jcs(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Recompute the digest and compare it with the recorded one
    pub fn verify(&self) -> Result<(), ManifestError> {
        let computed = Self::compute_sha256(&self.outcome)?;
        if computed != self.manifest_sha256 {
            return Err(ManifestError::DigestMismatch {
                recorded: self.manifest_sha256.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> Result<(), ManifestError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
