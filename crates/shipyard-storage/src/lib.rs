//! Shipyard Storage
//!
//! The shared-storage capability the staging core is written against, plus a
//! local-filesystem backend.

pub mod error;
pub mod local;
pub mod path;
pub mod status;

pub use error::StorageError;
pub use local::LocalStorage;
pub use path::StoragePath;
pub use status::{epoch_millis, FileStatus, Permission};

use std::path::Path;
use std::sync::Arc;

/// Operations the staging core needs from a distributed filesystem.
///
/// Every call may block on I/O. `list_status` on a missing path must return
/// `StorageError::NotFound` so callers can tell a not-yet-visible write apart
/// from a real failure.
pub trait Storage {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError>;

    /// Whether `path` exists and is a directory.
    fn is_directory(&self, path: &StoragePath) -> Result<bool, StorageError>;

    /// Metadata of a single file or directory.
    fn stat(&self, path: &StoragePath) -> Result<FileStatus, StorageError>;

    /// Children of a directory, or the file itself when `path` is a file.
    fn list_status(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError>;

    /// All files (not directories) beneath `path`, recursively.
    fn list_files_recursive(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError>;

    /// Copy a local file into storage.
    fn copy_from_local(
        &self,
        src: &Path,
        dst: &StoragePath,
        overwrite: bool,
        delete_source: bool,
    ) -> Result<(), StorageError>;

    /// Set the replication factor of an existing file.
    fn set_replication(&self, path: &StoragePath, factor: u16) -> Result<(), StorageError>;

    /// Create a directory and any missing parents with the given permission.
    fn mkdirs(&self, path: &StoragePath, permission: Permission) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).exists(path)
    }

    fn is_directory(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).is_directory(path)
    }

    fn stat(&self, path: &StoragePath) -> Result<FileStatus, StorageError> {
        (**self).stat(path)
    }

    fn list_status(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        (**self).list_status(path)
    }

    fn list_files_recursive(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        (**self).list_files_recursive(path)
    }

    fn copy_from_local(
        &self,
        src: &Path,
        dst: &StoragePath,
        overwrite: bool,
        delete_source: bool,
    ) -> Result<(), StorageError> {
        (**self).copy_from_local(src, dst, overwrite, delete_source)
    }

    fn set_replication(&self, path: &StoragePath, factor: u16) -> Result<(), StorageError> {
        (**self).set_replication(path, factor)
    }

    fn mkdirs(&self, path: &StoragePath, permission: Permission) -> Result<(), StorageError> {
        (**self).mkdirs(path, permission)
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).exists(path)
    }

    fn is_directory(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).is_directory(path)
    }

    fn stat(&self, path: &StoragePath) -> Result<FileStatus, StorageError> {
        (**self).stat(path)
    }

    fn list_status(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        (**self).list_status(path)
    }

    fn list_files_recursive(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        (**self).list_files_recursive(path)
    }

    fn copy_from_local(
        &self,
        src: &Path,
        dst: &StoragePath,
        overwrite: bool,
        delete_source: bool,
    ) -> Result<(), StorageError> {
        (**self).copy_from_local(src, dst, overwrite, delete_source)
    }

    fn set_replication(&self, path: &StoragePath, factor: u16) -> Result<(), StorageError> {
        (**self).set_replication(path, factor)
    }

    fn mkdirs(&self, path: &StoragePath, permission: Permission) -> Result<(), StorageError> {
        (**self).mkdirs(path, permission)
    }
}
