//! Crash simulation around atomic file replacement.
//!
//! Every data file is written to `<file>.tmp` and renamed over the target.
//! A crash can therefore leave:
//!
//! 1. **A partial temp file** - the target keeps its old contents
//! 2. **A complete temp file** - the rename never happened
//! 3. **A renamed file** - the new contents are in place
//!
//! [`CrashPoint`] names these states and [`simulate_crash`] reproduces them
//! on disk so tests can check that loading always sees a complete file.

use claimstore_storage::{temp_path, Compression, StagedFile};
use std::fs;
use std::path::Path;

/// Points at which a write can be interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Crash halfway through writing the temp file.
    DuringTempWrite,
    /// Crash after the temp file was written but before the rename.
    BeforeRename,
    /// Crash right after the rename.
    AfterRename,
}

impl CrashPoint {
    /// All crash points.
    pub const ALL: [CrashPoint; 3] = [
        CrashPoint::DuringTempWrite,
        CrashPoint::BeforeRename,
        CrashPoint::AfterRename,
    ];

    /// Returns true if the new contents are visible after this crash.
    pub fn new_contents_visible(self) -> bool {
        self == CrashPoint::AfterRename
    }
}

/// Leaves `target` in the state a crash at `point` would while replacing
/// it with `new_contents`.
pub fn simulate_crash(target: &Path, new_contents: &[u8], point: CrashPoint) {
    match point {
        CrashPoint::DuringTempWrite => {
            let half = &new_contents[..new_contents.len() / 2];
            fs::write(temp_path(target), half).expect("Failed to write partial temp file");
        }
        CrashPoint::BeforeRename => {
            let staged = StagedFile::write_with(target, Compression::None, |out| {
                out.write_all(new_contents)
            })
            .expect("Failed to stage file");
            // Skipping drop keeps the temp file, as a dead process would.
            std::mem::forget(staged);
        }
        CrashPoint::AfterRename => {
            StagedFile::write_with(target, Compression::None, |out| out.write_all(new_contents))
                .expect("Failed to stage file")
                .commit()
                .expect("Failed to commit file");
        }
    }
}
