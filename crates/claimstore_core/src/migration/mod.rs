//! One-time migration from the one-file-per-entity layout.
//!
//! Migration runs in three phases:
//!
//! 1. **Scan**: parse every legacy claim, player and group file. Files that
//!    fail to parse are logged and skipped.
//! 2. **Stage**: push the parsed records through the normal store mutation
//!    API.
//! 3. **Commit**: rename `ClaimData/` and `PlayerData/` to the lowest free
//!    `_backupN` suffix, recreate them empty, and `flush_all` both stores
//!    into them.
//!
//! A failure in the commit phase is fatal. Once committed, detection no
//! longer finds legacy files, so a second run does nothing.

pub mod legacy;

use crate::claims::ClaimStore;
use crate::dir::{claim_dir, player_dir, CLAIM_DIR, NEXT_CLAIM_ID_FILE, PLAYER_DIR};
use crate::error::{CoreError, CoreResult};
use crate::players::PlayerStore;
use crate::world::WorldResolver;
use claimstore_codec::{ClaimRecord, GroupRecord, PlayerRecord};
use legacy::LegacyError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Whether a data directory still holds legacy files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// No legacy files were found.
    NotNeeded,
    /// Legacy files are present.
    Needed,
}

/// Everything parsed from the legacy layout.
#[derive(Debug, Clone, Default)]
pub struct LegacyScan {
    /// Parsed claims, sorted by id.
    pub claims: Vec<ClaimRecord>,
    /// Parsed players with non-zero counters.
    pub players: Vec<PlayerRecord>,
    /// Parsed group bonuses.
    pub groups: Vec<GroupRecord>,
    /// Value of the legacy `_nextClaimID` file, if readable.
    pub legacy_next_id: Option<u64>,
    /// Files that could not be migrated.
    pub skipped_files: Vec<PathBuf>,
}

impl LegacyScan {
    /// The counter value after migration: past every migrated id and never
    /// below the legacy counter.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        let past_claims = self
            .claims
            .iter()
            .map(|c| c.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        past_claims.max(self.legacy_next_id.unwrap_or(0))
    }
}

/// Summary of a completed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Claims migrated.
    pub claims: usize,
    /// Players migrated.
    pub players: usize,
    /// Groups migrated.
    pub groups: usize,
    /// Legacy files that were skipped.
    pub skipped_files: Vec<PathBuf>,
    /// The `N` of the `_backupN` directories the legacy data was moved to.
    pub backup_suffix: u32,
}

/// Detects and migrates legacy data under a root directory.
#[derive(Debug, Clone)]
pub struct StorageMigrator {
    root: PathBuf,
}

impl StorageMigrator {
    /// Creates a migrator for the data directory `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scans for legacy claim or player files. Nothing is persisted.
    pub fn detect(&self) -> CoreResult<MigrationState> {
        let has_claims = list_file_names(&claim_dir(&self.root))?
            .iter()
            .any(|name| legacy::is_claim_file_name(name));
        let has_players = || -> CoreResult<bool> {
            Ok(list_file_names(&player_dir(&self.root))?
                .iter()
                .any(|name| legacy::is_player_file_name(name)))
        };

        if has_claims || has_players()? {
            Ok(MigrationState::Needed)
        } else {
            Ok(MigrationState::NotNeeded)
        }
    }

    /// Parses every legacy file without changing anything on disk.
    ///
    /// Claims whose world `resolver` does not know (ignoring case) are
    /// skipped.
    pub fn scan<R: WorldResolver>(&self, resolver: &R) -> CoreResult<LegacyScan> {
        let mut scan = LegacyScan::default();
        self.scan_claims(resolver, &mut scan)?;
        self.scan_player_data(&mut scan)?;

        info!(
            claims = scan.claims.len(),
            players = scan.players.len(),
            groups = scan.groups.len(),
            skipped = scan.skipped_files.len(),
            "scanned legacy data"
        );
        Ok(scan)
    }

    fn scan_claims<R: WorldResolver>(&self, resolver: &R, scan: &mut LegacyScan) -> CoreResult<()> {
        let dir = claim_dir(&self.root);

        for name in list_file_names(&dir)? {
            if !legacy::is_claim_file_name(&name) {
                continue;
            }
            let path = dir.join(&name);
            let Some(id) = legacy::claim_id_from_file_name(&name) else {
                debug!(file = %name, "skipping non-numeric claim file");
                scan.skipped_files.push(path);
                continue;
            };

            match legacy::read_claim_file(&path, id, resolver) {
                Ok(record) => scan.claims.push(record),
                Err(error) => skip_file(scan, path, "claim", &error),
            }
        }
        scan.claims.sort_by_key(|c| c.id);

        let next_id_path = dir.join(NEXT_CLAIM_ID_FILE);
        match fs::read_to_string(&next_id_path) {
            Ok(text) => {
                scan.legacy_next_id = legacy::parse_next_id(&text);
                if scan.legacy_next_id.is_none() {
                    warn!(path = %next_id_path.display(), "ignoring unreadable legacy claim counter");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn scan_player_data(&self, scan: &mut LegacyScan) -> CoreResult<()> {
        let dir = player_dir(&self.root);

        for name in list_file_names(&dir)? {
            let path = dir.join(&name);

            if let Some(group) = legacy::group_name_from_file_name(&name) {
                match read_legacy(&path, legacy::parse_group_file) {
                    Ok(Some(bonus)) => scan.groups.push(GroupRecord::new(group, bonus)),
                    Ok(None) => debug!(file = %name, "empty group file"),
                    Err(error) => skip_file(scan, path, "group", &error),
                }
                continue;
            }

            if !legacy::is_player_file_name(&name) {
                continue;
            }
            let Ok(uuid) = Uuid::try_parse(&name) else {
                scan.skipped_files.push(path);
                continue;
            };
            match read_legacy(&path, legacy::parse_player_file) {
                Ok((0, 0)) => debug!(file = %name, "player has no blocks, not migrating"),
                Ok((accrued, bonus)) => scan.players.push(PlayerRecord::new(uuid, accrued, bonus)),
                Err(error) => skip_file(scan, path, "player", &error),
            }
        }

        scan.players.sort_by_key(|p| p.uuid);
        scan.groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    /// Migrates all legacy data into `claims` and `players` and archives the
    /// legacy directories.
    ///
    /// # Errors
    ///
    /// Scan failures (an unreadable directory) are returned as is. Any
    /// failure while archiving or saving is a [`CoreError::MigrationIo`]; the
    /// data directory must not be used afterwards.
    pub fn migrate<R: WorldResolver>(
        &self,
        claims: &ClaimStore,
        players: &PlayerStore,
        resolver: &R,
    ) -> CoreResult<MigrationReport> {
        info!(root = %self.root.display(), "migrating legacy data to compact storage");
        let scan = self.scan(resolver)?;

        for record in &scan.claims {
            claims.mark_dirty(record.clone());
        }
        claims.set_next_id_at_least(scan.next_id());
        for player in &scan.players {
            players.set_player_data(player.uuid, player.accrued_blocks, player.bonus_blocks);
        }
        for group in &scan.groups {
            players.set_group_bonus(&group.name, group.bonus_blocks);
        }

        let backup_suffix = self.archive_legacy_dirs()?;

        claims
            .flush_all()
            .map_err(|e| CoreError::migration_io("saving migrated claims", e))?;
        players
            .flush_all()
            .map_err(|e| CoreError::migration_io("saving migrated player data", e))?;

        let report = MigrationReport {
            claims: scan.claims.len(),
            players: scan.players.len(),
            groups: scan.groups.len(),
            skipped_files: scan.skipped_files,
            backup_suffix,
        };
        info!(
            claims = report.claims,
            players = report.players,
            groups = report.groups,
            skipped = report.skipped_files.len(),
            backup = report.backup_suffix,
            "migration complete"
        );
        Ok(report)
    }

    /// The lowest `N >= 1` for which neither backup directory exists.
    pub fn next_backup_suffix(&self) -> u32 {
        (1..)
            .find(|n| {
                !self.backup_path(CLAIM_DIR, *n).exists() && !self.backup_path(PLAYER_DIR, *n).exists()
            })
            .unwrap_or(u32::MAX)
    }

    fn backup_path(&self, dir_name: &str, suffix: u32) -> PathBuf {
        self.root.join(format!("{dir_name}_backup{suffix}"))
    }

    fn archive_legacy_dirs(&self) -> CoreResult<u32> {
        let suffix = self.next_backup_suffix();

        for dir_name in [CLAIM_DIR, PLAYER_DIR] {
            let live = self.root.join(dir_name);
            if live.exists() {
                let backup = self.backup_path(dir_name, suffix);
                fs::rename(&live, &backup).map_err(|e| {
                    CoreError::migration_io(format!("archiving {}", live.display()), e)
                })?;
                info!(from = %live.display(), to = %backup.display(), "archived legacy data");
            }
            fs::create_dir_all(&live).map_err(|e| {
                CoreError::migration_io(format!("recreating {}", live.display()), e)
            })?;
        }
        Ok(suffix)
    }
}

fn skip_file(scan: &mut LegacyScan, path: PathBuf, kind: &str, error: &LegacyError) {
    warn!(path = %path.display(), %error, "skipping legacy {kind} file");
    scan.skipped_files.push(path);
}

fn read_legacy<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, LegacyError>,
) -> Result<T, LegacyError> {
    parse(&fs::read_to_string(path)?)
}

/// Sorted names of the regular files in `dir`; empty if `dir` is absent.
fn list_file_names(dir: &Path) -> CoreResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::StaticWorlds;
    use claimstore_storage::Compression;
    use tempfile::tempdir;

    const PLAYER: &str = "6f9619ff-8b86-d011-b42d-00cf4fc964ff";

    fn claim_doc(world: &str) -> String {
        format!(
            "Lesser Boundary Corner: {world};0;0;0\nGreater Boundary Corner: {world};9;9;9\nOwner: {PLAYER}\n"
        )
    }

    fn legacy_root() -> tempfile::TempDir {
        let root = tempdir().unwrap();
        let claims = root.path().join(CLAIM_DIR);
        let players = root.path().join(PLAYER_DIR);
        fs::create_dir_all(&claims).unwrap();
        fs::create_dir_all(&players).unwrap();

        fs::write(claims.join("3.yml"), claim_doc("world")).unwrap();
        fs::write(claims.join("8.yml"), claim_doc("world")).unwrap();
        fs::write(claims.join("9.yml"), claim_doc("atlantis")).unwrap();
        fs::write(claims.join("readme.yml"), claim_doc("world")).unwrap();
        fs::write(claims.join("_nextClaimID"), "5").unwrap();

        fs::write(players.join(PLAYER), "\n100\n25\n").unwrap();
        fs::write(players.join("0e4a1c6f-3a3e-4b7a-9c55-1b9d5bd7a0c1"), "\n0\n0\n").unwrap();
        fs::write(players.join("$vip"), "300\n").unwrap();
        fs::write(players.join("notes.txt"), "ignored").unwrap();
        root
    }

    fn stores(root: &Path) -> (ClaimStore, PlayerStore) {
        (
            ClaimStore::new(claim_dir(root), Compression::None),
            PlayerStore::new(player_dir(root), Compression::None),
        )
    }

    #[test]
    fn detect_empty_and_legacy_roots() {
        let empty = tempdir().unwrap();
        assert_eq!(
            StorageMigrator::new(empty.path()).detect().unwrap(),
            MigrationState::NotNeeded
        );

        let root = legacy_root();
        assert_eq!(
            StorageMigrator::new(root.path()).detect().unwrap(),
            MigrationState::Needed
        );
    }

    #[test]
    fn detect_players_only() {
        let root = tempdir().unwrap();
        let players = root.path().join(PLAYER_DIR);
        fs::create_dir_all(&players).unwrap();
        fs::write(players.join("$vip"), "1").unwrap();
        fs::write(players.join(format!("{PLAYER}.ignore")), "").unwrap();
        let migrator = StorageMigrator::new(root.path());
        assert_eq!(migrator.detect().unwrap(), MigrationState::NotNeeded);

        fs::write(players.join(PLAYER), "\n1\n1\n").unwrap();
        assert_eq!(migrator.detect().unwrap(), MigrationState::Needed);
    }

    #[test]
    fn scan_parses_and_skips() {
        let root = legacy_root();
        let scan = StorageMigrator::new(root.path())
            .scan(&StaticWorlds::new(["world"]))
            .unwrap();

        let ids: Vec<u64> = scan.claims.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 8]);
        assert_eq!(scan.players.len(), 1);
        assert_eq!(scan.players[0].accrued_blocks, 100);
        assert_eq!(scan.groups, vec![GroupRecord::new("vip", 300)]);
        assert_eq!(scan.legacy_next_id, Some(5));
        assert_eq!(scan.next_id(), 9);

        let skipped: Vec<String> = scan
            .skipped_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(skipped, vec!["9.yml", "readme.yml"]);
    }

    #[test]
    fn legacy_counter_wins_when_higher() {
        let scan = LegacyScan {
            claims: vec![ClaimRecord::new(
                4,
                "w",
                Default::default(),
                Default::default(),
            )],
            legacy_next_id: Some(40),
            ..LegacyScan::default()
        };
        assert_eq!(scan.next_id(), 40);
        assert_eq!(LegacyScan::default().next_id(), 0);
    }

    #[test]
    fn migrate_moves_everything_and_archives() {
        let root = legacy_root();
        let (claims, players) = stores(root.path());
        let migrator = StorageMigrator::new(root.path());

        let report = migrator
            .migrate(&claims, &players, &StaticWorlds::new(["world"]))
            .unwrap();
        assert_eq!(report.claims, 2);
        assert_eq!(report.players, 1);
        assert_eq!(report.groups, 1);
        assert_eq!(report.backup_suffix, 1);

        assert!(root.path().join("ClaimData_backup1/3.yml").is_file());
        assert!(root.path().join("PlayerData_backup1/$vip").is_file());
        assert!(root.path().join("ClaimData/claims_world.dat").is_file());
        assert!(root.path().join("PlayerData/playerdata.dat").is_file());
        assert!(root.path().join("PlayerData/groupdata.dat").is_file());
        assert!(!root.path().join("ClaimData/3.yml").exists());

        let (reloaded, reloaded_players) = stores(root.path());
        reloaded.load_next_id().unwrap();
        reloaded.load_world("world").unwrap();
        reloaded_players.load().unwrap();
        assert_eq!(reloaded.claim_count(), 2);
        assert_eq!(reloaded.next_id(), 9);
        assert_eq!(reloaded_players.get_group_bonus("vip"), 300);
        assert_eq!(
            reloaded_players
                .get_player_data(&Uuid::parse_str(PLAYER).unwrap())
                .map(|p| (p.accrued_blocks, p.bonus_blocks)),
            Some((100, 25))
        );

        assert_eq!(migrator.detect().unwrap(), MigrationState::NotNeeded);
    }

    #[test]
    fn backup_suffix_skips_taken_numbers() {
        let root = legacy_root();
        fs::create_dir(root.path().join("ClaimData_backup1")).unwrap();
        fs::create_dir(root.path().join("PlayerData_backup2")).unwrap();

        let migrator = StorageMigrator::new(root.path());
        assert_eq!(migrator.next_backup_suffix(), 3);

        let (claims, players) = stores(root.path());
        let report = migrator
            .migrate(&claims, &players, &StaticWorlds::new(["world"]))
            .unwrap();
        assert_eq!(report.backup_suffix, 3);
        assert!(root.path().join("ClaimData_backup3/8.yml").is_file());
    }

    #[test]
    fn archive_failure_is_fatal() {
        let root = legacy_root();
        // The root is a regular file, so the live directories cannot be
        // recreated under it.
        let migrator = StorageMigrator::new(root.path().join(CLAIM_DIR).join("3.yml"));
        let err = migrator.archive_legacy_dirs().unwrap_err();
        assert!(matches!(err, CoreError::MigrationIo { .. }));
    }
}
