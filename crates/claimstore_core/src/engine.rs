//! The storage engine: both stores over one data directory.

use crate::claims::{ActiveClaims, ClaimStore};
use crate::config::Config;
use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult};
use crate::migration::{MigrationReport, MigrationState, StorageMigrator};
use crate::players::PlayerStore;
use crate::report::{FlushOutcome, LoadReport};
use crate::stats::StorageStats;
use crate::world::WorldResolver;
use parking_lot::RwLock;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Lifecycle operations shared by persistence backends.
pub trait Persistence {
    /// Reads all persisted state into memory.
    fn load(&self) -> CoreResult<LoadReport>;

    /// Writes changes made since the last flush. Skips if a flush is
    /// already running.
    fn flush_dirty(&self) -> CoreResult<FlushOutcome>;

    /// Writes everything, waiting for any running flush.
    fn flush_all(&self) -> CoreResult<FlushOutcome>;

    /// Writes everything and stops accepting flushes.
    fn close(&self) -> CoreResult<()>;
}

/// A claim store and a player store over one data directory.
///
/// Opening an engine:
/// - opens (and by default locks) the data directory
/// - loads the id counter, the claim file of every world the resolver
///   knows, and the player files
/// - migrates legacy data if any is found and [`Config::migrate_legacy`]
///   is set
///
/// # Example
///
/// ```rust,ignore
/// use claimstore_core::{Config, Engine, Persistence, StaticWorlds};
///
/// let engine = Engine::open(path, Config::default(), StaticWorlds::new(["world"]))?;
/// let id = engine.claims().allocate_next_id();
/// engine.claims().mark_dirty(record);
/// engine.flush_dirty()?;
/// ```
pub struct Engine<R: WorldResolver> {
    config: Config,
    dir: DataDir,
    resolver: R,
    claims: ClaimStore,
    players: PlayerStore,
    migration: Option<MigrationReport>,
    is_open: RwLock<bool>,
}

impl<R: WorldResolver> Engine<R> {
    /// Opens the data directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory is locked by another process (`DataDirLocked`)
    /// - a data file has a missing header or unsupported version
    /// - migration fails to archive or save (`MigrationIo`)
    /// - I/O errors occur
    pub fn open(root: &Path, config: Config, resolver: R) -> CoreResult<Self> {
        let dir = DataDir::open(root, &config)?;
        let compression = config.compression_mode();

        let mut engine = Self {
            claims: ClaimStore::new(dir.claim_dir(), compression),
            players: PlayerStore::new(dir.player_dir(), compression),
            config,
            dir,
            resolver,
            migration: None,
            is_open: RwLock::new(true),
        };

        // A failed open must not save over files that were refused.
        if let Err(e) = engine.load_and_migrate() {
            *engine.is_open.write() = false;
            return Err(e);
        }

        info!(root = %engine.dir.root().display(), stats = %engine.stats(), "storage opened");
        Ok(engine)
    }

    fn load_and_migrate(&mut self) -> CoreResult<()> {
        self.load()?;

        if self.config.migrate_legacy {
            let migrator = StorageMigrator::new(self.dir.root());
            if migrator.detect()? == MigrationState::Needed {
                let report = migrator.migrate(&self.claims, &self.players, &self.resolver)?;
                self.migration = Some(report);
            }
        }
        Ok(())
    }

    /// The claim store.
    #[must_use]
    pub fn claims(&self) -> &ClaimStore {
        &self.claims
    }

    /// The player and group store.
    #[must_use]
    pub fn players(&self) -> &PlayerStore {
        &self.players
    }

    /// The world resolver.
    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The configuration the engine was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The data directory root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.root()
    }

    /// The report of the migration performed on open, if any.
    #[must_use]
    pub fn migration_report(&self) -> Option<&MigrationReport> {
        self.migration.as_ref()
    }

    /// Loads the claim file of a world the host has just made available.
    pub fn load_world(&self, world_name: &str) -> CoreResult<LoadReport> {
        self.ensure_open()?;
        self.claims.load_world(world_name)
    }

    /// Builds the live claim tree from the loaded records.
    #[must_use]
    pub fn active_claims(&self) -> ActiveClaims<R::Handle> {
        self.claims.resolve_active(&self.resolver)
    }

    /// Current record counts.
    #[must_use]
    pub fn stats(&self) -> StorageStats {
        StorageStats::collect(&self.claims, &self.players)
    }

    /// Returns true if either store has unflushed changes.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.claims.has_pending_changes() || self.players.has_pending_changes()
    }

    /// Checks if the engine is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::Closed)
        }
    }
}

impl<R: WorldResolver> Persistence for Engine<R> {
    fn load(&self) -> CoreResult<LoadReport> {
        self.ensure_open()?;
        let mut report = LoadReport::default();

        self.claims.load_next_id()?;
        for world in self.resolver.world_names() {
            report.merge(self.claims.load_world(&world)?);
        }
        report.merge(self.players.load()?);
        Ok(report)
    }

    fn flush_dirty(&self) -> CoreResult<FlushOutcome> {
        self.ensure_open()?;
        let claims = self.claims.flush_dirty();
        let players = self.players.flush_dirty();
        Ok(claims?.combine(players?))
    }

    fn flush_all(&self) -> CoreResult<FlushOutcome> {
        self.ensure_open()?;
        let claims = self.claims.flush_all();
        let players = self.players.flush_all();
        Ok(claims?.combine(players?))
    }

    fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        let claims = self.claims.flush_all();
        let players = self.players.flush_all();
        claims?;
        players?;

        *is_open = false;
        info!(root = %self.dir.root().display(), "storage closed");
        Ok(())
    }
}

impl<R: WorldResolver> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.dir.root())
            .field("is_open", &self.is_open())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<R: WorldResolver> Drop for Engine<R> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::StaticWorlds;
    use claimstore_codec::{ClaimRecord, Corner};
    use std::fs;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn worlds() -> StaticWorlds {
        StaticWorlds::new(["world", "world_nether"])
    }

    fn open(root: &Path) -> Engine<StaticWorlds> {
        Engine::open(root, Config::default(), worlds()).unwrap()
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempdir().unwrap();
        let engine = open(dir.path());
        assert!(engine.is_open());
        assert!(dir.path().join("ClaimData").is_dir());
        assert!(dir.path().join("PlayerData").is_dir());
        assert!(dir.path().join("LOCK").is_file());
        assert!(engine.migration_report().is_none());
        assert_eq!(engine.stats(), StorageStats::default());
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _engine = open(dir.path());
        let err = Engine::open(dir.path(), Config::default(), worlds()).unwrap_err();
        assert!(matches!(err, CoreError::DataDirLocked { .. }));
    }

    #[test]
    fn failed_open_leaves_files_untouched() {
        let dir = tempdir().unwrap();
        let player_file = dir.path().join("PlayerData/playerdata.dat");
        fs::create_dir_all(player_file.parent().unwrap()).unwrap();
        let contents = format!("V:2\n{}|5|5|future\n", Uuid::new_v4().simple());
        fs::write(&player_file, &contents).unwrap();

        let err = Engine::open(dir.path(), Config::default(), worlds()).unwrap_err();
        assert!(matches!(err, CoreError::FormatVersionUnsupported { found: 2, .. }));
        assert_eq!(fs::read_to_string(&player_file).unwrap(), contents);
        assert!(!dir.path().join("PlayerData/groupdata.dat").exists());
        assert!(!dir.path().join("ClaimData/claims_world.dat").exists());
    }

    #[test]
    fn invalid_utf8_does_not_fail_open() {
        let dir = tempdir().unwrap();
        let keep = Uuid::new_v4();
        let player_file = dir.path().join("PlayerData/playerdata.dat");
        fs::create_dir_all(player_file.parent().unwrap()).unwrap();
        let mut contents = format!("V:1\n{}|7|0\n", keep.simple()).into_bytes();
        contents.extend_from_slice(b"\xff\xfe|1|1\n");
        fs::write(&player_file, contents).unwrap();

        let engine = open(dir.path());
        assert_eq!(engine.players().get_player_data(&keep).map(|p| p.accrued_blocks), Some(7));
        drop(engine);

        let reopened = open(dir.path());
        assert_eq!(reopened.players().all_player_uuids(), vec![keep]);
    }

    #[test]
    fn close_persists_and_blocks_flushes() {
        let dir = tempdir().unwrap();
        let owner = Uuid::new_v4();
        {
            let engine = open(dir.path());
            let id = engine.claims().allocate_next_id();
            engine.claims().mark_dirty(
                ClaimRecord::new(id, "world", Corner::new(0, 0, 0), Corner::new(5, 5, 5))
                    .with_owner(owner),
            );
            engine.players().set_player_data(owner, 100, 0);
            engine.close().unwrap();
            assert!(!engine.is_open());
            assert!(matches!(engine.flush_dirty(), Err(CoreError::Closed)));
            engine.close().unwrap();
        }

        let engine = open(dir.path());
        assert_eq!(engine.claims().claim_count(), 1);
        assert_eq!(engine.players().player_count(), 1);
        assert_eq!(engine.claims().allocate_next_id(), 1);
    }

    #[test]
    fn drop_flushes() {
        let dir = tempdir().unwrap();
        {
            let engine = open(dir.path());
            engine.players().set_group_bonus("vip", 10);
        }
        assert_eq!(open(dir.path()).players().get_group_bonus("vip"), 10);
    }

    #[test]
    fn open_migrates_legacy_layout() {
        let dir = tempdir().unwrap();
        let claims = dir.path().join("ClaimData");
        fs::create_dir_all(&claims).unwrap();
        fs::write(
            claims.join("12.yml"),
            "Lesser Boundary Corner: world;0;0;0\nGreater Boundary Corner: world;4;4;4\n",
        )
        .unwrap();

        let engine = open(dir.path());
        let report = engine.migration_report().unwrap();
        assert_eq!(report.claims, 1);
        assert_eq!(report.backup_suffix, 1);
        assert!(engine.claims().get("world", 12).unwrap().is_admin());
        assert_eq!(engine.claims().next_id(), 13);
        assert!(dir.path().join("ClaimData_backup1/12.yml").is_file());
        assert!(!engine.has_pending_changes());
        drop(engine);

        let reopened = open(dir.path());
        assert!(reopened.migration_report().is_none());
        assert_eq!(reopened.claims().claim_count(), 1);
    }

    #[test]
    fn migration_can_be_disabled() {
        let dir = tempdir().unwrap();
        let claims = dir.path().join("ClaimData");
        fs::create_dir_all(&claims).unwrap();
        fs::write(claims.join("1.yml"), "Owner: x\n").unwrap();

        let config = Config::default().migrate_legacy(false);
        let engine = Engine::open(dir.path(), config, worlds()).unwrap();
        assert!(engine.migration_report().is_none());
        assert!(claims.join("1.yml").is_file());
    }

    #[test]
    fn active_claims_follow_resolver() {
        let dir = tempdir().unwrap();
        let engine = open(dir.path());
        let record = |id, world: &str| {
            ClaimRecord::new(id, world, Corner::new(0, 0, 0), Corner::new(1, 1, 1))
        };
        engine.claims().mark_dirty(record(0, "world"));
        engine.claims().mark_dirty(record(1, "world").with_parent(0));
        engine.claims().mark_dirty(record(2, "the_end"));

        let active = engine.active_claims();
        assert_eq!(active.len(), 2);
        assert_eq!(active.unresolved.len(), 1);
        assert_eq!(engine.stats().total_subclaims, 1);
    }
}
