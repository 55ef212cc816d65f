//! Error types for staging operations.

use std::io;
use std::path::PathBuf;

use shipyard_storage::StorageError;

use crate::shared_libs::SharedLibraryError;

/// Errors surfaced by the staging core.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Any storage failure other than a recovered not-yet-visible listing.
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    SharedLibrary(#[from] SharedLibraryError),

    #[error("File to copy cannot be a directory: {0}")]
    DirectoryUpload(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid application id: {0}")]
    InvalidApplicationId(String),

    #[error("I/O error at {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid dist bundle pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl StagingError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}
