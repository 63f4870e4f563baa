//! Crash-safe file replacement.
//!
//! A file is never rewritten in place. New contents go to a sibling
//! `<name>.tmp`, which is synced and then renamed over the target:
//!
//! 1. Write the temporary file
//! 2. `fsync` the temporary file
//! 3. Rename it over the target
//! 4. `fsync` the parent directory so the rename itself is durable
//!
//! A crash before step 3 leaves the previous target untouched. A crash after
//! step 3 leaves the new one. Readers never see a truncated target.

use crate::error::{StorageError, StorageResult};
use crate::lines::Compression;
use flate2::write::GzEncoder;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to the target's file name for the staging file.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Returns the staging path for `target`.
#[must_use]
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

/// A fully written and synced temporary file waiting to replace its target.
///
/// Dropping a `StagedFile` without calling [`commit`](Self::commit) removes
/// the temporary file and leaves the target alone.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    temp: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Writes the temporary sibling of `target` using `write`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AtomicWrite`] if the temporary file cannot be
    /// created, written or synced.
    pub fn write_with<F>(target: &Path, compression: Compression, write: F) -> StorageResult<Self>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let staged = Self {
            target: target.to_path_buf(),
            temp: temp_path(target),
            committed: false,
        };

        staged
            .fill(compression, write)
            .map_err(|e| StorageError::atomic_write(target, e))?;

        Ok(staged)
    }

    fn fill<F>(&self, compression: Compression, write: F) -> io::Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut out = BufWriter::new(File::create(&self.temp)?);

        match compression {
            Compression::None => write(&mut out)?,
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut out, flate2::Compression::default());
                write(&mut encoder)?;
                encoder.finish()?;
            }
        }

        let file = out.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()
    }

    /// The path of the temporary file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Renames the temporary file over the target and syncs the directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AtomicWrite`] if the rename or directory sync
    /// fails. If the rename failed the target is unchanged.
    pub fn commit(mut self) -> StorageResult<()> {
        fs::rename(&self.temp, &self.target)
            .map_err(|e| StorageError::atomic_write(&self.target, e))?;
        self.committed = true;

        if let Some(parent) = self.target.parent() {
            sync_dir(parent).map_err(|e| StorageError::atomic_write(&self.target, e))?;
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Atomically replaces `target` with whatever `write` produces.
///
/// # Errors
///
/// Returns [`StorageError::AtomicWrite`] on any failure; the target keeps
/// its previous contents.
pub fn replace_file<F>(target: &Path, compression: Compression, write: F) -> StorageResult<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    StagedFile::write_with(target, compression, write)?.commit()
}

/// Atomically replaces `target` with `lines`, each terminated by `\n`.
///
/// # Errors
///
/// Returns [`StorageError::AtomicWrite`] on any failure.
pub fn replace_lines<I, S>(target: &Path, compression: Compression, lines: I) -> StorageResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    replace_file(target, compression, |out| {
        for line in lines {
            out.write_all(line.as_ref().as_bytes())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    })
}

/// Syncs a directory so that creates, renames and deletes inside it are
/// durable.
///
/// # Errors
///
/// Returns an error if the directory cannot be opened or synced.
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Syncs a directory so that creates, renames and deletes inside it are
/// durable.
///
/// NTFS journals metadata updates, and directories cannot be opened for
/// syncing on Windows, so this is a no-op there.
#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
