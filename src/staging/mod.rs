//! Bulk staging and classpath assembly.
//!
//! Expands a mixed set of ship inputs into a flat plan, registers each entry
//! and builds a deterministic classpath: resource directories first, then
//! archives, each group sorted and deduplicated.

mod exclude;
mod expand;
mod manifest;

pub use exclude::{DistBundlePattern, DistBundleRule, DEFAULT_DIST_EXTENSION, DEFAULT_DIST_PREFIX};
pub use expand::{expand, join_relative, StagingEntry};
pub use manifest::{ManifestError, StagingManifest, StagingOutcome, SCHEMA_ID, SCHEMA_VERSION};

use std::collections::BTreeSet;

use shipyard_resource::ArtifactDescriptor;
use shipyard_storage::{Storage, StoragePath};
use tracing::{debug, info};

use crate::error::StagingError;
use crate::registrar::{ResourceRegistrar, ResourceTable};

/// Archive extension that goes on the classpath by file.
pub const ARCHIVE_EXTENSION: &str = ".jar";

/// Remote paths and descriptors of everything a bulk registration shipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippedArtifacts {
    pub remote_paths: Vec<StoragePath>,
    pub descriptors: Vec<ArtifactDescriptor>,
}

impl ShippedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ArtifactDescriptor) {
        self.remote_paths.push(descriptor.path.clone());
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Accumulates classpath contributions; ordering is fixed at [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct ClasspathBuilder {
    resources: BTreeSet<String>,
    archives: BTreeSet<String>,
}

impl ClasspathBuilder {
    /// Archives contribute their own path, anything else its directory.
    pub fn add(&mut self, entry: &StagingEntry) {
        if entry.relative_dest.ends_with(ARCHIVE_EXTENSION) {
            self.archives.insert(entry.relative_dest.clone());
        } else {
            self.resources.insert(entry.dest_dir().to_string());
        }
    }

    /// Resource directories, then archives, each sorted.
    pub fn finish(self) -> Vec<String> {
        self.resources.into_iter().chain(self.archives).collect()
    }
}

/// Registers many inputs through a [`ResourceRegistrar`].
pub struct BulkStager<'r, 'a, S: Storage + ?Sized> {
    registrar: &'r ResourceRegistrar<'a, S>,
    dist_pattern: &'r DistBundlePattern,
}

impl<'r, 'a, S: Storage + ?Sized> BulkStager<'r, 'a, S> {
    pub fn new(
        registrar: &'r ResourceRegistrar<'a, S>,
        dist_pattern: &'r DistBundlePattern,
    ) -> Self {
        Self {
            registrar,
            dist_pattern,
        }
    }

    /// Register every file in `inputs` under `logical_root` and return the
    /// classpath. Files named like the distribution bundle are skipped.
    /// Shared-library shadows are shipped but left off the classpath since
    /// the provided-library classpath already carries them.
    pub fn register_many(
        &self,
        table: &mut ResourceTable,
        inputs: &[StoragePath],
        logical_root: &str,
        replication: u16,
        shipped: &mut ShippedArtifacts,
    ) -> Result<Vec<String>, StagingError> {
        if replication < 1 {
            return Err(StagingError::InvalidArgument(format!(
                "replication factor must be at least 1, got {}",
                replication
            )));
        }
        if logical_root.trim_matches('/').is_empty() {
            return Err(StagingError::InvalidArgument(
                "logical resource directory must not be empty".to_string(),
            ));
        }

        let plan = expand(self.registrar.storage, inputs, logical_root)?;
        let mut classpath = ClasspathBuilder::default();

        for entry in &plan {
            if self.dist_pattern.matches(entry.file_name()) {
                debug!(source = %entry.source, "skipping distribution bundle in bulk staging");
                continue;
            }

            let registration = self.registrar.register_single(
                table,
                &entry.relative_dest,
                &entry.source,
                entry.dest_dir(),
                replication,
            )?;
            if registration.is_private() {
                classpath.add(entry);
            }
            shipped.push(registration.into_descriptor());
        }

        let classpath = classpath.finish();
        info!(
            inputs = inputs.len(),
            files = plan.len(),
            classpath_entries = classpath.len(),
            "registered ship files"
        );
        Ok(classpath)
    }
}
