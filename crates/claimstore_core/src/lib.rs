//! # claimstore core
//!
//! Compact flat-file storage for land claims and player block accounting.
//!
//! This crate provides:
//! - [`ClaimStore`] - claims partitioned by world, one file per world
//! - [`PlayerStore`] - player counters and group bonuses
//! - [`StorageMigrator`] - one-time import of the one-file-per-entity layout
//! - [`Engine`] - both stores over a locked data directory
//!
//! All mutation methods take `&self` and never touch the disk. Changes are
//! written by [`Persistence::flush_dirty`] (typically on a timer) and
//! [`Persistence::flush_all`] (on shutdown). Every file is replaced with a
//! temp-then-rename write, so a crash leaves either the old or the new
//! contents.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod claims;
mod config;
mod datafile;
mod dir;
mod engine;
mod error;
mod migration;
mod players;
mod report;
mod stats;
mod world;

pub use claims::{sanitize_world_name, ActiveClaims, ClaimNode, ClaimStore, CLAIM_FILE_PREFIX};
pub use config::Config;
pub use dir::{claim_dir, player_dir, DataDir, CLAIM_DIR, NEXT_CLAIM_ID_FILE, PLAYER_DIR};
pub use engine::{Engine, Persistence};
pub use error::{CoreError, CoreResult};
pub use migration::{
    legacy, LegacyScan, MigrationReport, MigrationState, StorageMigrator,
};
pub use players::{PlayerStore, GROUP_FILE, PLAYER_FILE};
pub use report::{FlushOutcome, LoadReport, SkippedLine};
pub use stats::StorageStats;
pub use world::{StaticWorlds, WorldResolver};

pub use claimstore_codec::{ClaimRecord, Corner, GroupRecord, PlayerRecord, Principal, Role};
pub use claimstore_storage::Compression;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
