//! Error types for storage operations.

use std::io;

use thiserror::Error;

/// Errors returned by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing exists at the path (yet).
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("operation '{op}' is not supported for {path}")]
    Unsupported { op: &'static str, path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Wrap an I/O error, mapping `NotFound` onto [`StorageError::NotFound`].
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this is the "nothing at this path" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
