//! Per-application staging orchestrator.
//!
//! [`ApplicationFileUploader`] owns one application's staging directory and
//! private resource table for the lifetime of a submission. It is not meant to
//! be shared: stage resources for several applications with one instance each.

use shipyard_resource::{ArtifactDescriptor, Visibility};
use shipyard_storage::{Permission, Storage, StoragePath};
use tracing::{debug, info};

use crate::application::{application_dir, ApplicationId};
use crate::consistency::{ConsistencyWaiter, Delay, RetryPolicy};
use crate::error::StagingError;
use crate::registrar::{Registration, ResourceRegistrar, ResourceTable};
use crate::shared_libs::SharedLibraryIndex;
use crate::staging::{BulkStager, DistBundlePattern, ShippedArtifacts, StagingOutcome};

/// Default namespace directory under the home directory.
pub const DEFAULT_NAMESPACE: &str = "shipyard";

/// Knobs that shape one uploader.
#[derive(Debug, Clone)]
pub struct StagingOptions {
    /// Staging directories live at `<home>/.<namespace>/<application id>`.
    pub namespace: String,
    pub retry: RetryPolicy,
    pub dist_pattern: DistBundlePattern,
}

impl Default for StagingOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            retry: RetryPolicy::default(),
            dist_pattern: DistBundlePattern::default(),
        }
    }
}

pub struct ApplicationFileUploader<S: Storage> {
    storage: S,
    home_dir: StoragePath,
    application_id: ApplicationId,
    application_dir: StoragePath,
    shared: SharedLibraryIndex,
    waiter: ConsistencyWaiter,
    dist_pattern: DistBundlePattern,
    resources: ResourceTable,
}

impl<S: Storage> ApplicationFileUploader<S> {
    /// Create the application's staging directory (owner-only) if it is
    /// missing and index the provided library directories.
    pub fn new(
        storage: S,
        home_dir: StoragePath,
        provided_lib_dirs: &[StoragePath],
        application_id: ApplicationId,
        options: StagingOptions,
    ) -> Result<Self, StagingError> {
        let application_dir = application_dir(&home_dir, &options.namespace, &application_id);
        if storage.exists(&application_dir)? {
            debug!(%application_dir, "application staging directory already exists");
        } else {
            storage.mkdirs(&application_dir, Permission::OWNER_ONLY)?;
            info!(
                %application_dir,
                permission = %Permission::OWNER_ONLY,
                "created application staging directory"
            );
        }

        let shared = SharedLibraryIndex::build(&storage, provided_lib_dirs)?;
        debug!(shared_libraries = shared.len(), "indexed provided lib dirs");

        Ok(Self {
            storage,
            home_dir,
            application_id,
            application_dir,
            shared,
            waiter: ConsistencyWaiter::new(options.retry),
            dist_pattern: options.dist_pattern,
            resources: ResourceTable::new(),
        })
    }

    /// Replace how the consistency waiter pauses between listings.
    pub fn with_delay(mut self, delay: impl Delay + 'static) -> Self {
        self.waiter = ConsistencyWaiter::with_delay(self.waiter.policy(), delay);
        self
    }

    /// Register one local or remote artifact under `key`.
    pub fn register_single(
        &mut self,
        key: &str,
        source: &StoragePath,
        relative_dest_dir: &str,
        replication: u16,
    ) -> Result<Registration, StagingError> {
        let registrar = ResourceRegistrar {
            storage: &self.storage,
            shared: &self.shared,
            waiter: &self.waiter,
            application_dir: &self.application_dir,
        };
        registrar.register_single(&mut self.resources, key, source, relative_dest_dir, replication)
    }

    /// Register files, local directories and remote directories under
    /// `logical_root` and return their classpath.
    pub fn register_many(
        &mut self,
        inputs: &[StoragePath],
        logical_root: &str,
        replication: u16,
        shipped: &mut ShippedArtifacts,
    ) -> Result<Vec<String>, StagingError> {
        let registrar = ResourceRegistrar {
            storage: &self.storage,
            shared: &self.shared,
            waiter: &self.waiter,
            application_dir: &self.application_dir,
        };
        BulkStager::new(&registrar, &self.dist_pattern).register_many(
            &mut self.resources,
            inputs,
            logical_root,
            replication,
            shipped,
        )
    }

    /// Register every shared library as PUBLIC under its own name and return
    /// their names in index order, leaving out the distribution bundle.
    pub fn register_provided(&mut self) -> Vec<String> {
        let mut classpath = Vec::with_capacity(self.shared.len());
        for entry in self.shared.iter() {
            let descriptor = ArtifactDescriptor::from_status(
                entry.file_name.as_str(),
                &entry.status,
                Visibility::Public,
            );
            self.resources
                .register(entry.file_name.as_str(), descriptor.to_local_resource());

            if self.dist_pattern.matches(&entry.file_name) {
                continue;
            }
            classpath.push(entry.file_name.clone());
        }
        classpath
    }

    pub fn registered_resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn home_dir(&self) -> &StoragePath {
        &self.home_dir
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    pub fn application_dir(&self) -> &StoragePath {
        &self.application_dir
    }

    pub fn shared_libraries(&self) -> &SharedLibraryIndex {
        &self.shared
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Hand the resource table to the launch-context builder.
    pub fn into_resources(self) -> ResourceTable {
        self.resources
    }

    /// Collect everything staged so far for a manifest.
    pub fn into_outcome(
        self,
        provided_classpath: Vec<String>,
        classpath: Vec<String>,
        shipped: ShippedArtifacts,
    ) -> StagingOutcome {
        StagingOutcome {
            application_id: self.application_id,
            application_dir: self.application_dir,
            provided_classpath,
            classpath,
            shipped: shipped.descriptors,
            remote_paths: shipped.remote_paths,
            resources: self.resources,
        }
    }
}
