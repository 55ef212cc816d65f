//! Expansion of ship inputs into a flat staging plan.
//!
//! Pure traversal: nothing is uploaded or registered here. Each input becomes
//! one or more `(source, relative destination)` pairs, where the destination
//! is rooted under a logical directory and keeps the file's position within
//! the tree it came from.

use std::path::Path;

use shipyard_storage::{Storage, StoragePath};
use walkdir::WalkDir;

use crate::error::StagingError;

/// One file to stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingEntry {
    pub source: StoragePath,
    /// Slash-separated, always beginning with the logical root.
    pub relative_dest: String,
}

impl StagingEntry {
    /// Final segment of the destination.
    pub fn file_name(&self) -> &str {
        self.relative_dest
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_dest)
    }

    /// Destination directory, relative to the application directory.
    pub fn dest_dir(&self) -> &str {
        match self.relative_dest.rfind('/') {
            Some(idx) => &self.relative_dest[..idx],
            None => "",
        }
    }
}

/// Expand `inputs` into a staging plan under `logical_root`.
///
/// Directories (local or remote) are walked recursively and each file is
/// placed relative to the directory's parent, so `conf/` shipped under `lib`
/// lands at `lib/conf/...`. Anything else is placed at `logical_root/name`.
pub fn expand<S: Storage + ?Sized>(
    storage: &S,
    inputs: &[StoragePath],
    logical_root: &str,
) -> Result<Vec<StagingEntry>, StagingError> {
    let mut plan = Vec::new();
    for input in inputs {
        if input.is_remote() {
            if storage.is_directory(input)? {
                expand_remote_dir(storage, input, logical_root, &mut plan)?;
                continue;
            }
        } else if let Some(local) = input.to_local_path().filter(|p| p.is_dir()) {
            expand_local_dir(&local, logical_root, &mut plan)?;
            continue;
        }

        plan.push(StagingEntry {
            source: input.clone(),
            relative_dest: join_relative(logical_root, input.name()),
        });
    }
    Ok(plan)
}

fn expand_remote_dir<S: Storage + ?Sized>(
    storage: &S,
    dir: &StoragePath,
    logical_root: &str,
    plan: &mut Vec<StagingEntry>,
) -> Result<(), StagingError> {
    let anchor = dir.parent();
    for file in storage.list_files_recursive(dir)? {
        let relative = anchor
            .as_ref()
            .and_then(|parent| parent.relativize(&file.path))
            .unwrap_or_else(|| file.name().to_string());
        plan.push(StagingEntry {
            relative_dest: join_relative(logical_root, &relative),
            source: file.path,
        });
    }
    Ok(())
}

fn expand_local_dir(
    dir: &Path,
    logical_root: &str,
    plan: &mut Vec<StagingEntry>,
) -> Result<(), StagingError> {
    let anchor = dir.parent().unwrap_or(dir);
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        // Links are never descended; only a link to a regular file ships.
        let file_type = entry.file_type();
        if file_type.is_dir() || (file_type.is_symlink() && !entry.path().is_file()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(anchor)
            .map_err(|_| StagingError::InvalidArgument(format!(
                "{} is not within {}",
                entry.path().display(),
                anchor.display()
            )))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        plan.push(StagingEntry {
            source: StoragePath::from_local(entry.path())?,
            relative_dest: join_relative(logical_root, &relative),
        });
    }
    Ok(())
}

/// Join two slash-separated relative paths.
pub fn join_relative(base: &str, relative: &str) -> String {
    let base = base.trim_matches('/');
    let relative = relative.trim_matches('/');
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, relative),
    }
}
