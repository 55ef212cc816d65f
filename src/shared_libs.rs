//! Index of pre-shared public libraries.
//!
//! Built once per submission by scanning the configured shared-library roots,
//! then consulted read-only. File names must be unique across all roots; a
//! duplicate is a configuration error because silently picking one copy would
//! make deployments non-reproducible.

use std::collections::HashMap;
use std::fmt;

use shipyard_storage::{FileStatus, Storage, StorageError, StoragePath};
use tracing::{debug, warn};

/// One file found beneath a shared-library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLibraryEntry {
    pub file_name: String,
    pub status: FileStatus,
    /// Position of the owning root in the configured root list.
    pub root_index: usize,
}

/// Two shared files with the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    pub file_name: String,
    pub first: StoragePath,
    pub second: StoragePath,
    /// Both copies sit beneath the same configured root.
    pub same_root: bool,
}

impl fmt::Display for DuplicateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.first, self.second)?;
        if self.same_root {
            f.write_str(" (same root)")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SharedLibraryError {
    #[error(
        "Two files with the same filename exist in the shared libs: {}. Please deduplicate.",
        join_conflicts(.0)
    )]
    DuplicateNames(Vec<DuplicateName>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn join_conflicts(conflicts: &[DuplicateName]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A file discovered during the scan, tagged with the root it came from.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file_name: String,
    pub status: FileStatus,
    pub root_index: usize,
}

/// Recursively list every configured root. Missing roots and roots that are
/// not directories are skipped with a warning.
pub fn scan<S: Storage + ?Sized>(
    storage: &S,
    roots: &[StoragePath],
) -> Result<Vec<ScannedFile>, StorageError> {
    let mut scanned = Vec::new();
    for (root_index, root) in roots.iter().enumerate() {
        if !storage.exists(root)? || !storage.is_directory(root)? {
            warn!(%root, "provided lib dir does not exist or is not a directory, ignoring");
            continue;
        }

        let files = storage.list_files_recursive(root)?;
        debug!(
            %root,
            files = %files.iter().map(|f| f.path.to_string()).collect::<Vec<_>>().join(", "),
            "found files in shared lib dir"
        );
        scanned.extend(files.into_iter().map(|status| ScannedFile {
            file_name: status.name().to_string(),
            status,
            root_index,
        }));
    }
    Ok(scanned)
}

/// Immutable name → metadata mapping of shared libraries, in scan order.
#[derive(Debug, Clone, Default)]
pub struct SharedLibraryIndex {
    entries: Vec<SharedLibraryEntry>,
    by_name: HashMap<String, usize>,
}

impl SharedLibraryIndex {
    /// Scan `roots` and build the index.
    pub fn build<S: Storage + ?Sized>(
        storage: &S,
        roots: &[StoragePath],
    ) -> Result<Self, SharedLibraryError> {
        let scanned = scan(storage, roots)?;
        Self::from_scanned(scanned)
    }

    /// Build from a finished scan, rejecting every duplicated name at once.
    pub fn from_scanned(scanned: Vec<ScannedFile>) -> Result<Self, SharedLibraryError> {
        let mut entries: Vec<SharedLibraryEntry> = Vec::with_capacity(scanned.len());
        let mut by_name = HashMap::with_capacity(scanned.len());
        let mut conflicts = Vec::new();

        for file in scanned {
            if let Some(&existing) = by_name.get(&file.file_name) {
                let first: &SharedLibraryEntry = &entries[existing];
                let same_root = first.root_index == file.root_index;
                debug!(
                    file_name = %file.file_name,
                    first_root = first.root_index,
                    second_root = file.root_index,
                    "duplicate shared library name"
                );
                conflicts.push(DuplicateName {
                    file_name: file.file_name,
                    first: first.status.path.clone(),
                    second: file.status.path,
                    same_root,
                });
                continue;
            }
            by_name.insert(file.file_name.clone(), entries.len());
            entries.push(SharedLibraryEntry {
                file_name: file.file_name,
                status: file.status,
                root_index: file.root_index,
            });
        }

        if !conflicts.is_empty() {
            return Err(SharedLibraryError::DuplicateNames(conflicts));
        }
        Ok(Self { entries, by_name })
    }

    /// Look up a shared file by its name.
    pub fn get(&self, file_name: &str) -> Option<&SharedLibraryEntry> {
        self.by_name.get(file_name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.by_name.contains_key(file_name)
    }

    /// Entries in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedLibraryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(path: &str, root_index: usize) -> ScannedFile {
        let status = FileStatus::file(StoragePath::parse(path).unwrap(), 1, 1);
        ScannedFile {
            file_name: status.name().to_string(),
            status,
            root_index,
        }
    }

    #[test]
    fn test_index_preserves_scan_order() {
        let index = SharedLibraryIndex::from_scanned(vec![
            scanned("hdfs://nn/shared/z.jar", 0),
            scanned("hdfs://nn/shared/a.jar", 0),
            scanned("hdfs://nn/plugins/m.jar", 1),
        ])
        .unwrap();

        let names: Vec<&str> = index.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["z.jar", "a.jar", "m.jar"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get("m.jar").unwrap().root_index, 1);
        assert!(index.contains("m.jar"));
        assert_eq!(
            index.get("a.jar").unwrap().status.path.to_string(),
            "hdfs://nn/shared/a.jar"
        );
        assert!(index.get("missing.jar").is_none());
    }

    #[test]
    fn test_duplicate_across_roots_names_both_paths() {
        let err = SharedLibraryIndex::from_scanned(vec![
            scanned("hdfs://nn/shared/x.jar", 0),
            scanned("hdfs://nn/plugins/x.jar", 1),
        ])
        .unwrap_err();

        match &err {
            SharedLibraryError::DuplicateNames(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].file_name, "x.jar");
                assert!(!conflicts[0].same_root);
            }
            other => panic!("Expected DuplicateNames, got {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("hdfs://nn/shared/x.jar - hdfs://nn/plugins/x.jar."));
        assert!(!message.contains("same root"));
    }

    #[test]
    fn test_all_conflicts_reported() {
        let err = SharedLibraryIndex::from_scanned(vec![
            scanned("hdfs://nn/a/x.jar", 0),
            scanned("hdfs://nn/a/y.jar", 0),
            scanned("hdfs://nn/b/x.jar", 1),
            scanned("hdfs://nn/b/y.jar", 1),
        ])
        .unwrap_err();

        match err {
            SharedLibraryError::DuplicateNames(conflicts) => assert_eq!(conflicts.len(), 2),
            other => panic!("Expected DuplicateNames, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_within_one_root_is_rejected() {
        let err = SharedLibraryIndex::from_scanned(vec![
            scanned("hdfs://nn/shared/a/x.jar", 0),
            scanned("hdfs://nn/shared/b/x.jar", 0),
        ])
        .unwrap_err();

        match &err {
            SharedLibraryError::DuplicateNames(conflicts) => assert!(conflicts[0].same_root),
            other => panic!("Expected DuplicateNames, got {:?}", other),
        }
        assert!(err
            .to_string()
            .contains("hdfs://nn/shared/a/x.jar - hdfs://nn/shared/b/x.jar (same root)"));
    }
}
