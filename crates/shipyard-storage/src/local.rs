//! Local-filesystem storage backend.
//!
//! Plain paths and `file://` URIs map onto themselves. Any other URI is mapped
//! beneath the backend root as `<root>/<scheme>/<authority>/<path>`, which lets
//! a single machine stand in for a distributed filesystem.

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::path::StoragePath;
use crate::status::{epoch_millis, FileStatus, Permission};
use crate::Storage;

/// Authority directory used for URIs without one (`hdfs:///x`).
const EMPTY_AUTHORITY: &str = "_";

/// Storage backed by the local filesystem.
#[derive(Debug)]
pub struct LocalStorage {
    /// Directory that remote URIs are mapped under.
    root: PathBuf,
    /// Replication factors requested per path. A local disk cannot replicate.
    replication: Mutex<HashMap<StoragePath, u16>>,
}

impl LocalStorage {
    /// Create a backend mapping remote URIs beneath `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            replication: Mutex::new(HashMap::new()),
        }
    }

    /// Directory that remote URIs are mapped under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location backing `path`.
    pub fn resolve(&self, path: &StoragePath) -> PathBuf {
        if let Some(local) = path.to_local_path() {
            return local;
        }
        let authority = if path.authority().is_empty() {
            EMPTY_AUTHORITY
        } else {
            path.authority()
        };
        self.root
            .join(path.scheme().unwrap_or_default())
            .join(authority)
            .join(path.path().trim_start_matches('/'))
    }

    /// Replication factor last requested for `path`, if any.
    pub fn replication(&self, path: &StoragePath) -> Option<u16> {
        let table = self.replication.lock().unwrap_or_else(|e| e.into_inner());
        table.get(path).copied()
    }

    fn metadata(&self, path: &StoragePath) -> Result<Metadata, StorageError> {
        fs::metadata(self.resolve(path)).map_err(|e| StorageError::from_io(path.to_string(), e))
    }

    fn probe(&self, path: &StoragePath) -> Result<Option<Metadata>, StorageError> {
        match fs::metadata(self.resolve(path)) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(path.to_string(), e)),
        }
    }
}

fn to_status(path: StoragePath, metadata: &Metadata) -> Result<FileStatus, StorageError> {
    let modified = metadata
        .modified()
        .map_err(|e| StorageError::from_io(path.to_string(), e))?;
    Ok(FileStatus {
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modification_time: epoch_millis(modified),
        is_dir: metadata.is_dir(),
        path,
    })
}

impl Storage for LocalStorage {
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        Ok(self.probe(path)?.is_some())
    }

    fn is_directory(&self, path: &StoragePath) -> Result<bool, StorageError> {
        Ok(self.probe(path)?.map(|m| m.is_dir()).unwrap_or(false))
    }

    fn stat(&self, path: &StoragePath) -> Result<FileStatus, StorageError> {
        let metadata = self.metadata(path)?;
        to_status(path.clone(), &metadata)
    }

    fn list_status(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        let metadata = self.metadata(path)?;
        if !metadata.is_dir() {
            return Ok(vec![to_status(path.clone(), &metadata)?]);
        }

        let read_dir = fs::read_dir(self.resolve(path))
            .map_err(|e| StorageError::from_io(path.to_string(), e))?;
        let mut statuses = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StorageError::from_io(path.to_string(), e))?;
            let child = path.join(&entry.file_name().to_string_lossy());
            let metadata = entry
                .metadata()
                .map_err(|e| StorageError::from_io(child.to_string(), e))?;
            statuses.push(to_status(child, &metadata)?);
        }
        statuses.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(statuses)
    }

    fn list_files_recursive(&self, path: &StoragePath) -> Result<Vec<FileStatus>, StorageError> {
        let metadata = self.metadata(path)?;
        if !metadata.is_dir() {
            return Ok(vec![to_status(path.clone(), &metadata)?]);
        }

        let base = self.resolve(path);
        let mut files = Vec::new();
        for entry in WalkDir::new(&base)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry.map_err(|e| StorageError::from_io(path.to_string(), e.into()))?;
            let file_type = entry.file_type();
            if !(file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&base)
                .map_err(|_| StorageError::InvalidPath(entry.path().display().to_string()))?;
            let child = path.join(&rel.to_string_lossy());
            let metadata = fs::metadata(entry.path())
                .map_err(|e| StorageError::from_io(child.to_string(), e))?;
            files.push(to_status(child, &metadata)?);
        }
        Ok(files)
    }

    fn copy_from_local(
        &self,
        src: &Path,
        dst: &StoragePath,
        overwrite: bool,
        delete_source: bool,
    ) -> Result<(), StorageError> {
        let target = self.resolve(dst);
        if !overwrite && target.exists() {
            return Err(StorageError::Io {
                path: dst.to_string(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "destination exists"),
            });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::from_io(dst.to_string(), e))?;
        }

        debug!(src = %src.display(), dst = %dst, "copying local file into storage");
        fs::copy(src, &target).map_err(|e| StorageError::from_io(src.display().to_string(), e))?;

        if delete_source {
            fs::remove_file(src).map_err(|e| StorageError::from_io(src.display().to_string(), e))?;
        }
        Ok(())
    }

    fn set_replication(&self, path: &StoragePath, factor: u16) -> Result<(), StorageError> {
        if self.probe(path)?.is_none() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let mut table = self.replication.lock().unwrap_or_else(|e| e.into_inner());
        table.insert(path.clone(), factor);
        Ok(())
    }

    fn mkdirs(&self, path: &StoragePath, permission: Permission) -> Result<(), StorageError> {
        let target = self.resolve(path);
        fs::create_dir_all(&target).map_err(|e| StorageError::from_io(path.to_string(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(permission.mode()))
                .map_err(|e| StorageError::from_io(path.to_string(), e))?;
        }
        #[cfg(not(unix))]
        let _ = permission;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn remote(raw: &str) -> StoragePath {
        StoragePath::parse(raw).unwrap()
    }

    fn setup() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("remote"));
        (dir, storage)
    }

    #[test]
    fn test_remote_uri_mapping() {
        let (dir, storage) = setup();
        let mapped = storage.resolve(&remote("hdfs://nn:8020/user/a.jar"));
        assert_eq!(mapped, dir.path().join("remote/hdfs/nn:8020/user/a.jar"));

        let mapped = storage.resolve(&remote("hdfs:///user/a.jar"));
        assert_eq!(mapped, dir.path().join("remote/hdfs/_/user/a.jar"));
    }

    #[test]
    fn test_copy_and_stat() {
        let (dir, storage) = setup();
        let src = dir.path().join("a.jar");
        fs::write(&src, "0123456789").unwrap();

        let dst = remote("hdfs://nn/app/lib/a.jar");
        storage.copy_from_local(&src, &dst, true, false).unwrap();

        let status = storage.stat(&dst).unwrap();
        assert_eq!(status.size, 10);
        assert!(!status.is_dir);
        assert_eq!(status.name(), "a.jar");
        assert!(src.exists(), "source must be kept");
        assert!(storage.is_directory(&remote("hdfs://nn/app/lib")).unwrap());
    }

    #[test]
    fn test_copy_without_overwrite_fails_when_present() {
        let (dir, storage) = setup();
        let src = dir.path().join("a.txt");
        fs::write(&src, "x").unwrap();
        let dst = remote("hdfs://nn/a.txt");

        storage.copy_from_local(&src, &dst, false, false).unwrap();
        let err = storage.copy_from_local(&src, &dst, false, false).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn test_copy_with_delete_source() {
        let (dir, storage) = setup();
        let src = dir.path().join("a.txt");
        fs::write(&src, "x").unwrap();

        storage
            .copy_from_local(&src, &remote("hdfs://nn/a.txt"), true, true)
            .unwrap();
        assert!(!src.exists());
    }

    #[test]
    fn test_list_status_missing_is_not_found() {
        let (_dir, storage) = setup();
        let err = storage.list_status(&remote("hdfs://nn/missing")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!storage.exists(&remote("hdfs://nn/missing")).unwrap());
        assert!(!storage.is_directory(&remote("hdfs://nn/missing")).unwrap());
    }

    #[test]
    fn test_list_status_of_file_returns_itself() {
        let (dir, storage) = setup();
        let src = dir.path().join("a.txt");
        fs::write(&src, "abc").unwrap();
        let dst = remote("hdfs://nn/a.txt");
        storage.copy_from_local(&src, &dst, true, false).unwrap();

        let listed = storage.list_status(&dst).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, dst);
        assert_eq!(listed[0].size, 3);
    }

    #[test]
    fn test_list_files_recursive_is_sorted_and_files_only() {
        let (_dir, storage) = setup();
        let base = storage.resolve(&remote("hdfs://nn/data"));
        fs::create_dir_all(base.join("sub")).unwrap();
        fs::write(base.join("z.txt"), "z").unwrap();
        fs::write(base.join("a.txt"), "a").unwrap();
        fs::write(base.join("sub/b.jar"), "b").unwrap();

        let files = storage.list_files_recursive(&remote("hdfs://nn/data")).unwrap();
        let names: Vec<String> = files.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "hdfs://nn/data/a.txt",
                "hdfs://nn/data/sub/b.jar",
                "hdfs://nn/data/z.txt",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_recursive_does_not_descend_links() {
        let (_dir, storage) = setup();
        let base = storage.resolve(&remote("hdfs://nn/data"));
        fs::create_dir_all(base.join("sub")).unwrap();
        fs::write(base.join("sub/b.jar"), "bb").unwrap();
        std::os::unix::fs::symlink(&base, base.join("sub/loop")).unwrap();
        std::os::unix::fs::symlink(base.join("sub/b.jar"), base.join("c.jar")).unwrap();

        let files = storage.list_files_recursive(&remote("hdfs://nn/data")).unwrap();
        let names: Vec<String> = files.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(names, vec!["hdfs://nn/data/c.jar", "hdfs://nn/data/sub/b.jar"]);
        assert_eq!(files[0].size, 2);
    }

    #[test]
    fn test_set_replication_requires_existing_path() {
        let (dir, storage) = setup();
        let missing = remote("hdfs://nn/a.txt");
        assert!(storage.set_replication(&missing, 3).unwrap_err().is_not_found());

        let src = dir.path().join("a.txt");
        fs::write(&src, "x").unwrap();
        storage.copy_from_local(&src, &missing, true, false).unwrap();
        storage.set_replication(&missing, 3).unwrap();
        assert_eq!(storage.replication(&missing), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_mkdirs_applies_permission() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, storage) = setup();
        let path = remote("hdfs://nn/home/.shipyard/app_1");
        storage.mkdirs(&path, Permission::OWNER_ONLY).unwrap();

        let mode = fs::metadata(storage.resolve(&path)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
