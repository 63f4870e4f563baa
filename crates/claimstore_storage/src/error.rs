//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Writing the temporary file or renaming it over the target failed.
    ///
    /// The target file still holds its previous contents.
    #[error("atomic write of {} failed: {source}", path.display())]
    AtomicWrite {
        /// The file that was being replaced.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// Reading a data file failed.
    #[error("reading {} failed: {source}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// Another process holds the directory lock.
    #[error("directory locked: {} is in use by another process", path.display())]
    Locked {
        /// The locked directory.
        path: PathBuf,
    },
}

impl StorageError {
    pub(crate) fn atomic_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::AtomicWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
