//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use shipyard::{ApplicationFileUploader, ApplicationId, Delay, Interrupted, StagingOptions};
use shipyard_storage::{FileStatus, LocalStorage, Permission, Storage, StorageError, StoragePath};
use tempfile::TempDir;

/// Local file mtime used to tell local and storage timestamps apart.
pub const OLD_LOCAL_MTIME_MS: i64 = 1_000_000_000;

pub const HOME: &str = "hdfs://nn/user/alice";

/// How a [`FlakyListing`] fails.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    PermissionDenied,
}

/// Wraps a storage backend and fails the first `failures` listings.
pub struct FlakyListing<S> {
    inner: S,
    failures: u32,
    failure: Failure,
    calls: Arc<AtomicU32>,
}

impl<S: Storage> FlakyListing<S> {
    pub fn new(inner: S, failures: u32, failure: Failure) -> Self {
        Self {
            inner,
            failures,
            failure,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter of `list_status` calls.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl<S: Storage> Storage for FlakyListing<S> {
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        self.inner.exists(path)
    }

    fn is_directory(&self, path: &StoragePath) -> Result<bool, StorageError> {
        self.inner.is_directory(path)
    }

    fn stat(&self, path: &StoragePath) -> Result<FileStatus, StorageError> {
        self.inner.stat(path)
    }

    fn list_status(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(match self.failure {
                Failure::NotFound => StorageError::NotFound(path.to_string()),
                Failure::PermissionDenied => StorageError::Io {
                    path: path.to_string(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
                },
            });
        }
        self.inner.list_status(path)
    }

    fn list_files_recursive(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        self.inner.list_files_recursive(path)
    }

    fn copy_from_local(
        &self,
        src: &Path,
        dst: &StoragePath,
        overwrite: bool,
        delete_source: bool,
    ) -> Result<(), StorageError> {
        self.inner.copy_from_local(src, dst, overwrite, delete_source)
    }

    fn set_replication(&self, path: &StoragePath, factor: u16) -> Result<(), StorageError> {
        self.inner.set_replication(path, factor)
    }

    fn mkdirs(&self, path: &StoragePath, permission: Permission) -> Result<(), StorageError> {
        self.inner.mkdirs(path, permission)
    }
}

/// Counts pauses instead of sleeping; optionally reports every pause as interrupted.
#[derive(Clone, Default)]
pub struct CountingDelay {
    pub waits: Arc<AtomicU32>,
    pub interrupt: bool,
}

impl CountingDelay {
    pub fn interrupting() -> Self {
        Self {
            interrupt: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> u32 {
        self.waits.load(Ordering::SeqCst)
    }
}

impl Delay for CountingDelay {
    fn wait(&self, _duration: Duration) -> Result<(), Interrupted> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if self.interrupt {
            return Err(Interrupted("test interrupt".to_string()));
        }
        Ok(())
    }
}

/// A temp directory holding local inputs (`local/`) and the storage backend (`remote/`).
pub struct Workspace {
    pub dir: TempDir,
    pub storage: LocalStorage,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("remote"));
        fs::create_dir_all(dir.path().join("local")).unwrap();
        Self { dir, storage }
    }

    pub fn local_dir(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    /// Write a local file under `local/` and return its location.
    pub fn local_file(&self, relative: &str, contents: &str) -> StoragePath {
        let path = self.local_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        StoragePath::from_local(&path).unwrap()
    }

    /// Like [`local_file`](Self::local_file) with an mtime far in the past.
    pub fn old_local_file(&self, relative: &str, contents: &str) -> StoragePath {
        let location = self.local_file(relative, contents);
        let path = location.to_local_path().unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_millis(OLD_LOCAL_MTIME_MS as u64))
            .unwrap();
        location
    }

    pub fn local_path(&self, relative: &str) -> StoragePath {
        StoragePath::from_local(&self.local_dir().join(relative)).unwrap()
    }

    /// Write a file directly into storage at `uri`.
    pub fn remote_file(&self, uri: &str, contents: &str) -> StoragePath {
        let location = StoragePath::parse(uri).unwrap();
        let backing = self.storage.resolve(&location);
        fs::create_dir_all(backing.parent().unwrap()).unwrap();
        fs::write(backing, contents).unwrap();
        location
    }

    pub fn uploader(
        &self,
        app_id: &str,
        shared_roots: &[&str],
    ) -> ApplicationFileUploader<&LocalStorage> {
        build_uploader(&self.storage, app_id, shared_roots)
    }
}

pub fn paths(uris: &[&str]) -> Vec<StoragePath> {
    uris.iter().map(|u| StoragePath::parse(u).unwrap()).collect()
}

pub fn build_uploader<S: Storage>(
    storage: S,
    app_id: &str,
    shared_roots: &[&str],
) -> ApplicationFileUploader<S> {
    ApplicationFileUploader::new(
        storage,
        StoragePath::parse(HOME).unwrap(),
        &paths(shared_roots),
        ApplicationId::new(app_id).unwrap(),
        StagingOptions::default(),
    )
    .unwrap()
}
