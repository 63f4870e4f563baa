//! Outcomes of load and flush operations.

use claimstore_codec::CodecError;
use std::path::PathBuf;

/// A line that was skipped while loading a data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// File containing the line.
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// Why the line could not be decoded.
    pub error: CodecError,
}

/// Summary of loading one or more data files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of files that existed and were read.
    pub files: usize,
    /// Number of records loaded.
    pub loaded: usize,
    /// Lines that failed to decode and were skipped.
    pub skipped: Vec<SkippedLine>,
}

impl LoadReport {
    /// Folds another report into this one.
    pub fn merge(&mut self, other: LoadReport) {
        self.files += other.files;
        self.loaded += other.loaded;
        self.skipped.extend(other.skipped);
    }

    /// Returns true if no line was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Result of a flush request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was running; nothing was done.
    Skipped,
    /// There was nothing to write.
    Clean,
    /// Files were rewritten.
    Written {
        /// Number of files replaced.
        files: usize,
    },
}

impl FlushOutcome {
    /// Combines the outcomes of two independent flushes.
    #[must_use]
    pub fn combine(self, other: FlushOutcome) -> FlushOutcome {
        match (self, other) {
            (Self::Written { files: a }, Self::Written { files: b }) => Self::Written { files: a + b },
            (Self::Written { files }, _) | (_, Self::Written { files }) => Self::Written { files },
            (Self::Skipped, _) | (_, Self::Skipped) => Self::Skipped,
            (Self::Clean, Self::Clean) => Self::Clean,
        }
    }

    /// Number of files written.
    #[must_use]
    pub fn files_written(self) -> usize {
        match self {
            Self::Written { files } => files,
            Self::Skipped | Self::Clean => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_outcomes() {
        let w = |files| FlushOutcome::Written { files };
        assert_eq!(w(1).combine(w(2)), w(3));
        assert_eq!(w(1).combine(FlushOutcome::Skipped), w(1));
        assert_eq!(FlushOutcome::Clean.combine(FlushOutcome::Skipped), FlushOutcome::Skipped);
        assert_eq!(FlushOutcome::Clean.combine(FlushOutcome::Clean), FlushOutcome::Clean);
        assert_eq!(w(4).files_written(), 4);
    }
}
