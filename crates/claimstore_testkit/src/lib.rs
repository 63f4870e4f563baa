//! # claimstore testkit
//!
//! Test utilities for claimstore.
//!
//! This crate provides:
//! - Temporary data directories and engine helpers
//! - A builder for the legacy one-file-per-entity layout
//! - Property-based test generators using proptest
//! - Crash simulation around atomic file replacement
//!
//! ## Usage
//!
//! ```rust,ignore
//! use claimstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_engine() {
//!     let dir = TestDataDir::new();
//!     let engine = dir.open(&["world"]);
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
