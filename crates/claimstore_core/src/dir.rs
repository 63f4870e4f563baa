//! Data directory management.
//!
//! This module handles the file system layout for claimstore:
//!
//! ```text
//! <root>/
//! ├─ LOCK                          # Advisory lock for single-process ownership
//! ├─ ClaimData/
//! │  ├─ claims_<world>.dat[.gz]    # One file per world
//! │  └─ _nextClaimID               # Claim id counter
//! └─ PlayerData/
//!    ├─ playerdata.dat[.gz]        # All players
//!    └─ groupdata.dat[.gz]         # All group bonuses
//! ```

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use claimstore_storage::{DirLock, StorageError};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding claim files.
pub const CLAIM_DIR: &str = "ClaimData";
/// Directory holding player and group files.
pub const PLAYER_DIR: &str = "PlayerData";
/// Claim id counter file inside [`CLAIM_DIR`].
pub const NEXT_CLAIM_ID_FILE: &str = "_nextClaimID";

/// Returns the claim directory under `root`.
#[must_use]
pub fn claim_dir(root: &Path) -> PathBuf {
    root.join(CLAIM_DIR)
}

/// Returns the player directory under `root`.
#[must_use]
pub fn player_dir(root: &Path) -> PathBuf {
    root.join(PLAYER_DIR)
}

/// An opened data directory.
///
/// Holds the directory lock (when configured) for as long as it lives.
#[derive(Debug)]
pub struct DataDir {
    root: PathBuf,
    _lock: Option<DirLock>,
}

impl DataDir {
    /// Opens or creates a data directory and its `ClaimData`/`PlayerData`
    /// subdirectories.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another process holds the lock (returns `DataDirLocked`)
    /// - I/O errors occur
    pub fn open(root: &Path, config: &Config) -> CoreResult<Self> {
        if !root.exists() {
            if config.create_if_missing {
                fs::create_dir_all(root)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "data directory does not exist: {}",
                    root.display()
                )));
            }
        }

        if !root.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                root.display()
            )));
        }

        let lock = if config.lock_directory {
            Some(DirLock::acquire(root).map_err(|e| match e {
                StorageError::Locked { path } => CoreError::DataDirLocked { path },
                other => CoreError::Storage(other),
            })?)
        } else {
            None
        };

        let dir = Self {
            root: root.to_path_buf(),
            _lock: lock,
        };
        dir.ensure_layout()?;
        Ok(dir)
    }

    /// Creates the claim and player directories if they are missing.
    pub fn ensure_layout(&self) -> CoreResult<()> {
        fs::create_dir_all(self.claim_dir())?;
        fs::create_dir_all(self.player_dir())?;
        Ok(())
    }

    /// Returns the root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the claim directory.
    #[must_use]
    pub fn claim_dir(&self) -> PathBuf {
        claim_dir(&self.root)
    }

    /// Returns the player directory.
    #[must_use]
    pub fn player_dir(&self) -> PathBuf {
        player_dir(&self.root)
    }
}
