//! Player and group record store.
//!
//! Two files live in `PlayerData/`: `playerdata.dat` with one line per
//! player and `groupdata.dat` with one line per permission group. Both are
//! rewritten whole on flush. Records whose values are all zero are never
//! written.

use crate::datafile::{read_data_file, write_data_file};
use crate::error::{CoreError, CoreResult};
use crate::report::{FlushOutcome, LoadReport};
use claimstore_codec::{
    decode_group, decode_player, encode_group, encode_player, GroupRecord, PlayerRecord,
};
use claimstore_storage::Compression;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Base name of the player file.
pub const PLAYER_FILE: &str = "playerdata";
/// Base name of the group file.
pub const GROUP_FILE: &str = "groupdata";

/// Store for player block accounting and group bonuses.
#[derive(Debug)]
pub struct PlayerStore {
    dir: PathBuf,
    compression: Compression,
    players: RwLock<HashMap<Uuid, PlayerRecord>>,
    groups: RwLock<HashMap<String, i32>>,
    dirty_players: Mutex<HashSet<Uuid>>,
    groups_dirty: AtomicBool,
    /// Set when a file exists but was refused on load.
    unreadable: Mutex<Option<PathBuf>>,
    flush_lock: Mutex<()>,
}

impl PlayerStore {
    /// Creates an empty store rooted at `dir` (the `PlayerData` directory).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, compression: Compression) -> Self {
        Self {
            dir: dir.into(),
            compression,
            players: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
            dirty_players: Mutex::new(HashSet::new()),
            groups_dirty: AtomicBool::new(false),
            unreadable: Mutex::new(None),
            flush_lock: Mutex::new(()),
        }
    }

    /// The directory this store reads and writes.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the player file.
    #[must_use]
    pub fn player_file_path(&self) -> PathBuf {
        self.data_path(PLAYER_FILE)
    }

    /// Path of the group file.
    #[must_use]
    pub fn group_file_path(&self) -> PathBuf {
        self.data_path(GROUP_FILE)
    }

    fn data_path(&self, base: &str) -> PathBuf {
        self.dir
            .join(format!("{base}{}", self.compression.data_extension()))
    }

    /// Loads both files, replacing the in-memory maps. Absent files load as
    /// empty. Players whose counters are both zero are dropped.
    ///
    /// # Errors
    ///
    /// Fails on a missing header or unsupported version in either file;
    /// flushes then refuse to write until a later load succeeds. Malformed
    /// lines are skipped and listed in the report.
    pub fn load(&self) -> CoreResult<LoadReport> {
        let mut report = LoadReport::default();

        let player_path = self.player_file_path();
        let players = read_data_file(&player_path, self.compression, "player", decode_player)
            .inspect_err(|_| *self.unreadable.lock() = Some(player_path.clone()))?;
        let group_path = self.group_file_path();
        let groups = read_data_file(&group_path, self.compression, "group", decode_group)
            .inspect_err(|_| *self.unreadable.lock() = Some(group_path.clone()))?;
        *self.unreadable.lock() = None;

        let mut player_map = HashMap::new();
        if let Some((records, file_report)) = players {
            report.merge(file_report);
            player_map.extend(
                records
                    .into_iter()
                    .filter(|r| !r.is_default())
                    .map(|r| (r.uuid, r)),
            );
        }

        let mut group_map = HashMap::new();
        if let Some((records, file_report)) = groups {
            report.merge(file_report);
            group_map.extend(records.into_iter().map(|g| (g.name, g.bonus_blocks)));
        }

        info!(
            players = player_map.len(),
            groups = group_map.len(),
            skipped = report.skipped.len(),
            "loaded player data"
        );
        *self.players.write() = player_map;
        *self.groups.write() = group_map;
        Ok(report)
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Returns the stored record for a player.
    #[must_use]
    pub fn get_player_data(&self, uuid: &Uuid) -> Option<PlayerRecord> {
        self.players.read().get(uuid).copied()
    }

    /// Stores a player's counters.
    ///
    /// Setting both to zero removes the player; the store is only marked
    /// dirty if a record was actually removed.
    pub fn set_player_data(&self, uuid: Uuid, accrued_blocks: i32, bonus_blocks: i32) {
        let record = PlayerRecord::new(uuid, accrued_blocks, bonus_blocks);
        let changed = {
            let mut players = self.players.write();
            if record.is_default() {
                players.remove(&uuid).is_some()
            } else {
                players.insert(uuid, record);
                true
            }
        };

        if changed {
            self.dirty_players.lock().insert(uuid);
        }
    }

    /// UUIDs of every stored player.
    #[must_use]
    pub fn all_player_uuids(&self) -> Vec<Uuid> {
        let mut uuids: Vec<Uuid> = self.players.read().keys().copied().collect();
        uuids.sort();
        uuids
    }

    /// Number of stored players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Bonus blocks for a group, 0 if unknown.
    #[must_use]
    pub fn get_group_bonus(&self, name: &str) -> i32 {
        self.groups.read().get(name).copied().unwrap_or(0)
    }

    /// Sets a group's bonus blocks. Zero removes the group.
    pub fn set_group_bonus(&self, name: &str, bonus_blocks: i32) {
        {
            let mut groups = self.groups.write();
            if bonus_blocks == 0 {
                groups.remove(name);
            } else {
                groups.insert(name.to_string(), bonus_blocks);
            }
        }
        self.groups_dirty.store(true, Ordering::SeqCst);
    }

    /// Every group bonus, keyed and ordered by group name.
    #[must_use]
    pub fn all_group_bonuses(&self) -> BTreeMap<String, i32> {
        self.groups
            .read()
            .iter()
            .map(|(name, bonus)| (name.clone(), *bonus))
            .collect()
    }

    /// Returns true if any player or group change is unflushed.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.dirty_players.lock().is_empty() || self.groups_dirty.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Flushing
    // =========================================================================

    /// Rewrites the player file if any player changed, and the group file if
    /// any group changed.
    ///
    /// Returns [`FlushOutcome::Skipped`] if another flush is running.
    ///
    /// # Errors
    ///
    /// Returns the first write failure. The pending state of a file that
    /// failed to write is restored.
    pub fn flush_dirty(&self) -> CoreResult<FlushOutcome> {
        let Some(_guard) = self.flush_lock.try_lock() else {
            debug!("player flush already in progress, skipping");
            return Ok(FlushOutcome::Skipped);
        };

        let dirty = std::mem::take(&mut *self.dirty_players.lock());
        let groups_dirty = self.groups_dirty.swap(false, Ordering::SeqCst);
        if dirty.is_empty() && !groups_dirty {
            return Ok(FlushOutcome::Clean);
        }

        self.write_files(dirty, false, groups_dirty)
    }

    /// Rewrites both files unconditionally, waiting for any in-progress
    /// flush.
    ///
    /// # Errors
    ///
    /// Returns the first write failure; pending state is restored.
    pub fn flush_all(&self) -> CoreResult<FlushOutcome> {
        let _guard = self.flush_lock.lock();

        let dirty = std::mem::take(&mut *self.dirty_players.lock());
        self.groups_dirty.store(false, Ordering::SeqCst);
        self.write_files(dirty, true, true)
    }

    fn write_files(
        &self,
        dirty: HashSet<Uuid>,
        force_players: bool,
        write_groups: bool,
    ) -> CoreResult<FlushOutcome> {
        if let Some(path) = self.unreadable.lock().clone() {
            warn!(path = %path.display(), "player data failed to load, not saving");
            self.dirty_players.lock().extend(dirty);
            if write_groups {
                self.groups_dirty.store(true, Ordering::SeqCst);
            }
            return Err(CoreError::OverwriteRefused { path });
        }

        let mut files = 0;
        let mut first_error = None;

        if force_players || !dirty.is_empty() {
            match self.write_players() {
                Ok(()) => files += 1,
                Err(e) => {
                    warn!(error = %e, "failed to save player data");
                    self.dirty_players.lock().extend(dirty);
                    first_error.get_or_insert(e);
                }
            }
        }

        if write_groups {
            match self.write_groups() {
                Ok(()) => files += 1,
                Err(e) => {
                    warn!(error = %e, "failed to save group data");
                    self.groups_dirty.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(FlushOutcome::Written { files }),
        }
    }

    fn write_players(&self) -> CoreResult<()> {
        let mut records: Vec<PlayerRecord> = self
            .players
            .read()
            .values()
            .filter(|r| !r.is_default())
            .copied()
            .collect();
        records.sort_by_key(|r| r.uuid);

        write_data_file(
            &self.player_file_path(),
            self.compression,
            records.iter().map(encode_player),
        )?;
        debug!(players = records.len(), "saved player data");
        Ok(())
    }

    fn write_groups(&self) -> CoreResult<()> {
        let records: Vec<GroupRecord> = self
            .all_group_bonuses()
            .into_iter()
            .filter(|(_, bonus)| *bonus != 0)
            .map(|(name, bonus)| GroupRecord::new(name, bonus))
            .collect();

        write_data_file(
            &self.group_file_path(),
            self.compression,
            records.iter().map(encode_group),
        )?;
        debug!(groups = records.len(), "saved group data");
        Ok(())
    }
}
