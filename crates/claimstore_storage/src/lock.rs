//! Advisory lock on a data directory.
//!
//! The engine assumes a single process owns the data directory. The lock
//! turns a second concurrent owner into an error instead of silent
//! corruption.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the locked directory.
pub const LOCK_FILE: &str = "LOCK";

/// An exclusive advisory lock, released when dropped.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    _file: File,
}

impl DirLock {
    /// Acquires the lock on `dir` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock, or
    /// an I/O error if the lock file cannot be created.
    pub fn acquire(dir: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: dir.to_path_buf(),
            });
        }

        Ok(Self {
            path: dir.to_path_buf(),
            _file: file,
        })
    }

    /// The locked directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails() {
        let dir = tempdir().unwrap();
        let _first = DirLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            DirLock::acquire(dir.path()),
            Err(StorageError::Locked { .. })
        ));
    }

    #[test]
    fn released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _lock = DirLock::acquire(dir.path()).unwrap();
        }
        let lock = DirLock::acquire(dir.path()).unwrap();
        assert_eq!(lock.path(), dir.path());
    }
}
