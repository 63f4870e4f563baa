//! Error types for claimstore core.

use claimstore_codec::CodecError;
use claimstore_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in claimstore core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage primitive error (atomic write, read, lock).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Line codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A data file declares a format version newer than this build reads.
    #[error(
        "{} has format version {found}, newer than supported version {supported}",
        path.display()
    )]
    FormatVersionUnsupported {
        /// The offending file.
        path: PathBuf,
        /// Version declared in the file header.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// A flush would replace a file that could not be loaded.
    #[error("refusing to overwrite {}, which failed to load", path.display())]
    OverwriteRefused {
        /// The file left untouched.
        path: PathBuf,
    },

    /// A data file or directory does not have the expected shape.
    #[error("invalid data format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A single line failed to decode. Loading skips the line and continues.
    #[error("malformed record at {}:{line}: {source}", path.display())]
    MalformedRecord {
        /// File containing the line.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Why decoding failed.
        #[source]
        source: CodecError,
    },

    /// A claim refers to a world the host cannot resolve.
    #[error("claim {claim_id} refers to unknown world '{world}'")]
    WorldUnresolvable {
        /// The world name stored with the claim.
        world: String,
        /// The claim that was dropped from the active set.
        claim_id: u64,
    },

    /// Saving migrated data or archiving legacy directories failed.
    #[error("migration failed: {message}: {source}")]
    MigrationIo {
        /// The step that failed.
        message: String,
        /// The underlying failure.
        #[source]
        source: Box<CoreError>,
    },

    /// The data directory is owned by another process.
    #[error("data directory locked: {} is in use by another process", path.display())]
    DataDirLocked {
        /// The locked directory.
        path: PathBuf,
    },

    /// The engine has been closed.
    #[error("engine is closed")]
    Closed,
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Wraps a failure from the save-or-archive phase of migration.
    pub fn migration_io(message: impl Into<String>, source: impl Into<CoreError>) -> Self {
        Self::MigrationIo {
            message: message.into(),
            source: Box::new(source.into()),
        }
    }

    /// Returns true if this error came from a failed temp-then-rename write.
    #[must_use]
    pub fn is_atomic_write(&self) -> bool {
        matches!(self, Self::Storage(StorageError::AtomicWrite { .. }))
    }
}
