//! Engine configuration.

use claimstore_storage::Compression;

/// Configuration for opening a data directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether data files are gzip-compressed. Fixed for the life of the
    /// engine; files carry no in-band marker besides the `.gz` extension.
    pub compression: bool,

    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to migrate legacy one-file-per-record data on open.
    pub migrate_legacy: bool,

    /// Whether to hold an advisory lock on the data directory.
    pub lock_directory: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression: false,
            create_if_missing: true,
            migrate_legacy: true,
            lock_directory: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether data files are gzip-compressed.
    #[must_use]
    pub const fn compression(mut self, value: bool) -> Self {
        self.compression = value;
        self
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether legacy data is migrated on open.
    #[must_use]
    pub const fn migrate_legacy(mut self, value: bool) -> Self {
        self.migrate_legacy = value;
        self
    }

    /// Sets whether the data directory is locked while open.
    #[must_use]
    pub const fn lock_directory(mut self, value: bool) -> Self {
        self.lock_directory = value;
        self
    }

    /// The compression mode implied by [`Config::compression`].
    #[must_use]
    pub const fn compression_mode(&self) -> Compression {
        Compression::from_flag(self.compression)
    }
}
