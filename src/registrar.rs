//! Per-artifact registration.
//!
//! Decides, for a single artifact, whether it is referenced in place (already
//! remote), shadowed by a shared library, or uploaded into the application's
//! staging directory, and records private registrations in the application's
//! [`ResourceTable`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shipyard_resource::{ArtifactDescriptor, LocalResource, Visibility};
use shipyard_storage::{epoch_millis, Storage, StoragePath};
use tracing::{debug, warn};

use crate::consistency::ConsistencyWaiter;
use crate::error::StagingError;
use crate::shared_libs::SharedLibraryIndex;

/// Outcome of registering one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Already in shared storage; referenced in place and registered privately.
    AlreadyRemote(ArtifactDescriptor),
    /// A shared library with the same name exists. The descriptor is keyed by
    /// the shared file's own name and is PUBLIC; nothing was registered.
    ReusedShared(ArtifactDescriptor),
    /// Copied into the application directory and registered privately.
    Uploaded(ArtifactDescriptor),
}

impl Registration {
    pub fn descriptor(&self) -> &ArtifactDescriptor {
        match self {
            Self::AlreadyRemote(d) | Self::ReusedShared(d) | Self::Uploaded(d) => d,
        }
    }

    pub fn into_descriptor(self) -> ArtifactDescriptor {
        match self {
            Self::AlreadyRemote(d) | Self::ReusedShared(d) | Self::Uploaded(d) => d,
        }
    }

    /// Whether this registration added an entry to the private table.
    pub fn is_private(&self) -> bool {
        !matches!(self, Self::ReusedShared(_))
    }
}

/// Result of inserting into a [`ResourceTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableInsert {
    Inserted,
    /// The key was already registered with an equal record.
    Unchanged,
    /// The key was registered with a different record, which was replaced.
    Replaced(LocalResource),
}

/// Resources registered for one application, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable {
    resources: BTreeMap<String, LocalResource>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resource` under `key`. A differing record for an existing key
    /// replaces it and is reported.
    pub fn register(&mut self, key: impl Into<String>, resource: LocalResource) -> TableInsert {
        let key = key.into();
        if self.resources.get(&key) == Some(&resource) {
            return TableInsert::Unchanged;
        }
        match self.resources.insert(key.clone(), resource) {
            None => TableInsert::Inserted,
            Some(previous) => {
                warn!(
                    %key,
                    previous = %previous.path,
                    "resource key registered twice with different descriptors; replacing"
                );
                TableInsert::Replaced(previous)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&LocalResource> {
        self.resources.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LocalResource)> {
        self.resources.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, LocalResource> {
        self.resources
    }
}

/// Read-only context needed to register artifacts for one application.
pub struct ResourceRegistrar<'a, S: Storage + ?Sized> {
    pub storage: &'a S,
    pub shared: &'a SharedLibraryIndex,
    pub waiter: &'a ConsistencyWaiter,
    pub application_dir: &'a StoragePath,
}

impl<'a, S: Storage + ?Sized> ResourceRegistrar<'a, S> {
    /// Register a single local or remote artifact.
    ///
    /// * `key` - resource name in the application's namespace
    /// * `source` - local file or remote location
    /// * `relative_dest_dir` - upload directory relative to the application directory
    /// * `replication` - replication factor of an uploaded copy
    pub fn register_single(
        &self,
        table: &mut ResourceTable,
        key: &str,
        source: &StoragePath,
        relative_dest_dir: &str,
        replication: u16,
    ) -> Result<Registration, StagingError> {
        if source.is_remote() {
            let status = self.storage.stat(source)?;
            debug!(path = %status.path, "using remote file to register local resource");

            let descriptor = ArtifactDescriptor::from_status(key, &status, Visibility::Application);
            table.register(key, descriptor.to_local_resource());
            return Ok(Registration::AlreadyRemote(descriptor));
        }

        if let Some(entry) = self.shared.get(source.name()) {
            debug!(
                provided = %entry.status.path,
                local = %source,
                "using provided file instead of the local one"
            );
            let descriptor = ArtifactDescriptor::from_status(
                entry.file_name.clone(),
                &entry.status,
                Visibility::Public,
            );
            return Ok(Registration::ReusedShared(descriptor));
        }

        let local = source
            .to_local_path()
            .ok_or_else(|| StagingError::InvalidArgument(format!("not a local path: {}", source)))?;
        let metadata = fs::metadata(&local).map_err(|e| StagingError::local_io(&local, e))?;
        let (remote, modification_time) =
            self.upload_local_file(&local, &metadata, relative_dest_dir, replication)?;

        let descriptor = ArtifactDescriptor::new(
            key,
            remote,
            metadata.len(),
            modification_time,
            Visibility::Application,
        );
        table.register(key, descriptor.to_local_resource());
        Ok(Registration::Uploaded(descriptor))
    }

    /// Copy a local file into the application directory and resolve the
    /// modification time the resource manager will see.
    fn upload_local_file(
        &self,
        local: &Path,
        metadata: &fs::Metadata,
        relative_dest_dir: &str,
        replication: u16,
    ) -> Result<(StoragePath, i64), StagingError> {
        if metadata.is_dir() {
            return Err(StagingError::DirectoryUpload(local.to_path_buf()));
        }

        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StagingError::InvalidArgument(format!("no file name: {}", local.display()))
            })?;
        let dst = self.application_dir.join(relative_dest_dir).join(&name);

        debug!(
            src = %local.display(),
            %dst,
            replication,
            "copying to application directory"
        );
        self.storage.copy_from_local(local, &dst, true, false)?;
        self.storage.set_replication(&dst, replication)?;

        let local_time = metadata
            .modified()
            .map(epoch_millis)
            .map_err(|e| StagingError::local_io(local, e))?;
        match self.waiter.wait_for_listing(self.storage, &dst)? {
            Some(statuses) => {
                let remote_time = statuses[0].modification_time;
                debug!(
                    %dst,
                    modification_time = remote_time,
                    "got modification time from remote path"
                );
                Ok((dst, remote_time))
            }
            None => {
                debug!(
                    %dst,
                    modification_time = local_time,
                    "failed to fetch remote modification time, using local timestamp"
                );
                Ok((dst, local_time))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_storage::LocalStorage;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        storage: LocalStorage,
        shared: SharedLibraryIndex,
        waiter: ConsistencyWaiter,
        app_dir: StoragePath,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let storage = LocalStorage::new(dir.path().join("remote"));
            Self {
                dir,
                storage,
                shared: SharedLibraryIndex::default(),
                waiter: ConsistencyWaiter::default(),
                app_dir: StoragePath::parse("hdfs://nn/user/alice/.shipyard/app_1").unwrap(),
            }
        }

        fn registrar(&self) -> ResourceRegistrar<'_, LocalStorage> {
            ResourceRegistrar {
                storage: &self.storage,
                shared: &self.shared,
                waiter: &self.waiter,
                application_dir: &self.app_dir,
            }
        }

        fn local_file(&self, name: &str, contents: &str) -> StoragePath {
            let path = self.dir.path().join(name);
            fs::write(&path, contents).unwrap();
            StoragePath::from_local(&path).unwrap()
        }
    }

    fn resource(path: &str, size: u64) -> LocalResource {
        LocalResource {
            path: StoragePath::parse(path).unwrap(),
            size,
            modification_time: 1,
            visibility: Visibility::Application,
        }
    }

    #[test]
    fn test_table_reports_equivalent_and_replaced() {
        let mut table = ResourceTable::new();
        assert_eq!(table.register("a", resource("hdfs://nn/a", 1)), TableInsert::Inserted);
        assert_eq!(table.register("a", resource("hdfs://nn/a", 1)), TableInsert::Unchanged);
        assert_eq!(table.len(), 1);

        let outcome = table.register("a", resource("hdfs://nn/b", 2));
        assert_eq!(outcome, TableInsert::Replaced(resource("hdfs://nn/a", 1)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").unwrap().size, 2);
    }

    #[test]
    fn test_upload_registers_under_key() {
        let fx = Fixture::new();
        let source = fx.local_file("a.jar", "0123456789");
        let mut table = ResourceTable::new();

        let registration = fx
            .registrar()
            .register_single(&mut table, "lib/a.jar", &source, "lib", 3)
            .unwrap();

        let Registration::Uploaded(descriptor) = &registration else {
            panic!("Expected Uploaded, got {:?}", registration);
        };
        assert_eq!(descriptor.key, "lib/a.jar");
        assert_eq!(descriptor.size, 10);
        assert_eq!(descriptor.visibility, Visibility::Application);
        assert_eq!(
            descriptor.path.to_string(),
            "hdfs://nn/user/alice/.shipyard/app_1/lib/a.jar"
        );
        assert_eq!(fx.storage.replication(&descriptor.path), Some(3));
        assert_eq!(
            descriptor.modification_time,
            fx.storage.stat(&descriptor.path).unwrap().modification_time
        );
        assert_eq!(table.get("lib/a.jar"), Some(&descriptor.to_local_resource()));
    }

    #[test]
    fn test_upload_with_empty_dest_dir_lands_in_app_dir() {
        let fx = Fixture::new();
        let source = fx.local_file("app-dist-1.0.jar", "dist");
        let mut table = ResourceTable::new();

        let registration = fx
            .registrar()
            .register_single(&mut table, "app-dist-1.0.jar", &source, "", 1)
            .unwrap();
        assert_eq!(
            registration.descriptor().path.to_string(),
            "hdfs://nn/user/alice/.shipyard/app_1/app-dist-1.0.jar"
        );
    }

    #[test]
    fn test_directory_upload_rejected() {
        let fx = Fixture::new();
        let dir = fx.dir.path().join("conf");
        fs::create_dir(&dir).unwrap();
        let mut table = ResourceTable::new();

        let err = fx
            .registrar()
            .register_single(
                &mut table,
                "lib/conf",
                &StoragePath::from_local(&dir).unwrap(),
                "lib",
                1,
            )
            .unwrap_err();
        assert!(matches!(err, StagingError::DirectoryUpload(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remote_artifact_referenced_in_place() {
        let fx = Fixture::new();
        let remote = StoragePath::parse("hdfs://nn/prestaged/udf.jar").unwrap();
        let backing = fx.storage.resolve(&remote);
        fs::create_dir_all(backing.parent().unwrap()).unwrap();
        fs::write(&backing, "udf").unwrap();
        let mut table = ResourceTable::new();

        let registration = fx
            .registrar()
            .register_single(&mut table, "lib/udf.jar", &remote, "lib", 3)
            .unwrap();

        let Registration::AlreadyRemote(descriptor) = &registration else {
            panic!("Expected AlreadyRemote, got {:?}", registration);
        };
        assert_eq!(descriptor.path, remote);
        assert_eq!(descriptor.size, 3);
        assert_eq!(descriptor.visibility, Visibility::Application);
        assert!(table.contains_key("lib/udf.jar"));
        assert_eq!(fx.storage.replication(&remote), None, "remote files are not touched");
    }

    #[test]
    fn test_remote_uri_without_authority_referenced_in_place() {
        let fx = Fixture::new();
        let remote = StoragePath::parse("hdfs:/prestaged/udf.jar").unwrap();
        let backing = fx.storage.resolve(&remote);
        fs::create_dir_all(backing.parent().unwrap()).unwrap();
        fs::write(&backing, "udf!").unwrap();
        let mut table = ResourceTable::new();

        let registration = fx
            .registrar()
            .register_single(&mut table, "lib/udf.jar", &remote, "lib", 1)
            .unwrap();

        let Registration::AlreadyRemote(descriptor) = &registration else {
            panic!("Expected AlreadyRemote, got {:?}", registration);
        };
        assert_eq!(descriptor.path.to_string(), "hdfs:///prestaged/udf.jar");
        assert_eq!(descriptor.size, 4);
        assert!(table.contains_key("lib/udf.jar"));
    }

    #[test]
    fn test_missing_remote_artifact_is_an_error() {
        let fx = Fixture::new();
        let mut table = ResourceTable::new();
        let err = fx
            .registrar()
            .register_single(
                &mut table,
                "lib/x.jar",
                &StoragePath::parse("hdfs://nn/nowhere/x.jar").unwrap(),
                "lib",
                1,
            )
            .unwrap_err();
        assert!(matches!(err, StagingError::Storage(ref e) if e.is_not_found()));
    }
}
