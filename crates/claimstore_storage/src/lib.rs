//! # claimstore storage
//!
//! Filesystem primitives for claimstore.
//!
//! This crate knows nothing about record formats. It provides:
//!
//! - [`replace_file`] / [`replace_lines`] - crash-safe temp-then-rename writes
//! - [`LineReader`] - numbered line iteration with optional gzip decoding
//! - [`DirLock`] - single-process ownership of a data directory
//!
//! ## Example
//!
//! ```no_run
//! use claimstore_storage::{replace_lines, Compression, LineReader};
//! use std::path::Path;
//!
//! let path = Path::new("playerdata.dat");
//! replace_lines(path, Compression::None, ["V:1"]).unwrap();
//! for line in LineReader::open(path, Compression::None).unwrap() {
//!     println!("{}", line.unwrap().text);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod error;
mod lines;
mod lock;

pub use atomic::{replace_file, replace_lines, sync_dir, temp_path, StagedFile, TEMP_SUFFIX};
pub use error::{StorageError, StorageResult};
pub use lines::{Compression, Line, LineReader};
pub use lock::{DirLock, LOCK_FILE};
