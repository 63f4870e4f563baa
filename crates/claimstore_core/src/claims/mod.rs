//! Claim record store.
//!
//! Claims are kept in memory partitioned by world and persisted as one file
//! per world:
//!
//! ```text
//! ClaimData/
//! ├─ claims_world.dat
//! ├─ claims_world_nether.dat
//! └─ _nextClaimID
//! ```
//!
//! Mutations only touch memory and the pending sets. [`ClaimStore::flush_dirty`]
//! rewrites the whole file of every world with pending changes; there is no
//! append mode.
//!
//! ## Concurrency
//!
//! All methods take `&self`. Mutations hold short internal locks and never
//! block on I/O. Flushes are serialized by a flush lock: `flush_dirty` skips
//! if another flush is running, `flush_all` waits for it. A flush drains the
//! pending sets before taking its snapshot, so a mutation that arrives while
//! the flush is writing is picked up by the next one.

mod active;

pub use active::{ActiveClaims, ClaimNode};

use crate::datafile::{read_data_file, write_data_file};
use crate::dir::NEXT_CLAIM_ID_FILE;
use crate::error::{CoreError, CoreResult};
use crate::report::{FlushOutcome, LoadReport};
use claimstore_codec::{decode_claim, encode_claim, ClaimRecord};
use claimstore_storage::{replace_file, Compression};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// File name prefix for per-world claim files.
pub const CLAIM_FILE_PREFIX: &str = "claims_";

type Partition = HashMap<u64, ClaimRecord>;

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
#[must_use]
pub fn sanitize_world_name(world_name: &str) -> String {
    world_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Pending work drained from the store at the start of a flush.
#[derive(Debug, Default)]
struct WorldPending {
    writes: Vec<u64>,
    deletes: Vec<u64>,
}

/// Store for claim records.
#[derive(Debug)]
pub struct ClaimStore {
    dir: PathBuf,
    compression: Compression,
    worlds: RwLock<HashMap<String, Partition>>,
    /// Claim id -> world of every record written since the last flush.
    pending_writes: Mutex<HashMap<u64, String>>,
    /// `(world, id)` of every record deleted since the last flush.
    pending_deletes: Mutex<Vec<(String, u64)>>,
    next_id: AtomicU64,
    persisted_next_id: Mutex<Option<u64>>,
    /// Worlds whose file exists but was refused on load.
    unreadable: Mutex<HashSet<String>>,
    flush_lock: Mutex<()>,
}

impl ClaimStore {
    /// Creates an empty store rooted at `dir` (the `ClaimData` directory).
    ///
    /// Nothing is read until [`load_next_id`](Self::load_next_id) and
    /// [`load_world`](Self::load_world) are called.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, compression: Compression) -> Self {
        Self {
            dir: dir.into(),
            compression,
            worlds: RwLock::new(HashMap::new()),
            pending_writes: Mutex::new(HashMap::new()),
            pending_deletes: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            persisted_next_id: Mutex::new(None),
            unreadable: Mutex::new(HashSet::new()),
            flush_lock: Mutex::new(()),
        }
    }

    /// The directory this store reads and writes.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The compression mode of this store.
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Path of the file holding `world_name`'s claims.
    #[must_use]
    pub fn world_file_path(&self, world_name: &str) -> PathBuf {
        self.dir.join(format!(
            "{CLAIM_FILE_PREFIX}{}{}",
            sanitize_world_name(world_name),
            self.compression.data_extension()
        ))
    }

    fn next_id_path(&self) -> PathBuf {
        self.dir.join(NEXT_CLAIM_ID_FILE)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reads the persisted id counter.
    ///
    /// A missing file leaves the counter unchanged. Unparseable contents are
    /// logged and treated as 0; loading claim files afterwards still moves the
    /// counter past every id seen.
    pub fn load_next_id(&self) -> CoreResult<()> {
        let path = self.next_id_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match content.trim().parse::<u64>() {
            Ok(next) => {
                self.next_id.fetch_max(next, Ordering::SeqCst);
                *self.persisted_next_id.lock() = Some(next);
            }
            Err(_) => {
                warn!(path = %path.display(), "invalid next claim id file, starting from 0");
            }
        }
        Ok(())
    }

    /// Loads the claim file for `world_name`, replacing its in-memory
    /// partition.
    ///
    /// An absent file yields an empty partition.
    ///
    /// # Errors
    ///
    /// Fails without touching the partition if the file's header is missing
    /// or declares an unsupported version; flushes then refuse to replace
    /// that file until a later load succeeds. Individual malformed lines are
    /// skipped and listed in the returned report.
    pub fn load_world(&self, world_name: &str) -> CoreResult<LoadReport> {
        let path = self.world_file_path(world_name);
        let loaded = match read_data_file(&path, self.compression, "claim", |line| {
            decode_claim(line, world_name)
        }) {
            Ok(loaded) => {
                self.unreadable.lock().remove(world_name);
                loaded
            }
            Err(e) => {
                self.unreadable.lock().insert(world_name.to_string());
                return Err(e);
            }
        };

        let Some((records, report)) = loaded else {
            self.worlds
                .write()
                .insert(world_name.to_string(), Partition::new());
            return Ok(LoadReport::default());
        };

        let mut partition = Partition::with_capacity(records.len());
        for record in records {
            self.next_id
                .fetch_max(record.id.saturating_add(1), Ordering::SeqCst);
            partition.insert(record.id, record);
        }

        info!(
            world = world_name,
            claims = partition.len(),
            skipped = report.skipped.len(),
            "loaded claims"
        );
        self.worlds.write().insert(world_name.to_string(), partition);
        Ok(report)
    }

    /// Lists the sanitized world names of every claim file on disk.
    ///
    /// Sanitization is lossy, so these are only equal to the real world
    /// names when the originals contained no special characters.
    pub fn discover_world_files(&self) -> CoreResult<Vec<String>> {
        let suffix = self.compression.data_extension();
        let mut names = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let file_name = entry?.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(world) = name
                .strip_prefix(CLAIM_FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(suffix))
            {
                names.push(world.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Upserts `record` and marks it for the next flush.
    ///
    /// If a record with the same id lives in another world partition it is
    /// moved, and the old world is rewritten on the next flush as well.
    pub fn mark_dirty(&self, record: ClaimRecord) {
        let id = record.id;
        let world = record.world_name.clone();
        let mut moved_from = Vec::new();

        {
            let mut worlds = self.worlds.write();
            for (name, partition) in worlds.iter_mut() {
                if *name != world && partition.remove(&id).is_some() {
                    moved_from.push(name.clone());
                }
            }
            worlds.entry(world.clone()).or_default().insert(id, record);
        }

        self.next_id
            .fetch_max(id.saturating_add(1), Ordering::SeqCst);

        if !moved_from.is_empty() {
            let mut deletes = self.pending_deletes.lock();
            deletes.extend(moved_from.into_iter().map(|name| (name, id)));
        }
        self.pending_writes.lock().insert(id, world);
    }

    /// Removes claim `id` from `world_name`.
    ///
    /// Cancels any pending write for the id. The world file is rewritten
    /// without the record on the next flush; no tombstone is written.
    pub fn mark_deleted(&self, id: u64, world_name: &str) {
        if let Some(partition) = self.worlds.write().get_mut(world_name) {
            partition.remove(&id);
        }
        self.pending_writes.lock().remove(&id);
        self.pending_deletes
            .lock()
            .push((world_name.to_string(), id));
    }

    /// Returns the next claim id and advances the counter.
    pub fn allocate_next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the id the next allocation will hand out.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Raises the counter to at least `next`. Never lowers it.
    pub fn set_next_id_at_least(&self, next: u64) {
        self.next_id.fetch_max(next, Ordering::SeqCst);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a copy of one record.
    #[must_use]
    pub fn get(&self, world_name: &str, id: u64) -> Option<ClaimRecord> {
        self.worlds.read().get(world_name)?.get(&id).cloned()
    }

    /// Returns every record in a world, sorted by id.
    #[must_use]
    pub fn world_claims(&self, world_name: &str) -> Vec<ClaimRecord> {
        let mut records: Vec<ClaimRecord> = self
            .worlds
            .read()
            .get(world_name)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Returns every record across all worlds, sorted by id.
    #[must_use]
    pub fn all_claims(&self) -> Vec<ClaimRecord> {
        let mut records: Vec<ClaimRecord> = self
            .worlds
            .read()
            .values()
            .flat_map(|partition| partition.values().cloned())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Names of all loaded world partitions, sorted.
    #[must_use]
    pub fn worlds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.worlds.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of records held.
    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.worlds.read().values().map(HashMap::len).sum()
    }

    /// Returns true if any write, delete or counter change is unflushed.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.pending_writes.lock().is_empty()
            || !self.pending_deletes.lock().is_empty()
            || self.counter_dirty()
    }

    fn counter_dirty(&self) -> bool {
        *self.persisted_next_id.lock() != Some(self.next_id())
    }

    // =========================================================================
    // Flushing
    // =========================================================================

    /// Rewrites the file of every world with pending writes or deletes, then
    /// the id counter if it changed.
    ///
    /// Returns [`FlushOutcome::Skipped`] without doing anything if another
    /// flush is in progress.
    ///
    /// # Errors
    ///
    /// Returns the first write failure. Every world whose file could not be
    /// replaced keeps its pending changes, so the next flush retries it.
    pub fn flush_dirty(&self) -> CoreResult<FlushOutcome> {
        let Some(_guard) = self.flush_lock.try_lock() else {
            debug!("claim flush already in progress, skipping");
            return Ok(FlushOutcome::Skipped);
        };

        let pending = self.drain_pending();
        if pending.is_empty() && !self.counter_dirty() {
            return Ok(FlushOutcome::Clean);
        }

        let worlds: Vec<String> = pending.keys().cloned().collect();
        self.write_worlds(worlds, pending, false)
    }

    /// Rewrites every world file and the id counter regardless of pending
    /// state. Waits for an in-progress flush to finish first.
    ///
    /// # Errors
    ///
    /// Returns the first write failure; failed worlds keep their pending
    /// changes.
    pub fn flush_all(&self) -> CoreResult<FlushOutcome> {
        let _guard = self.flush_lock.lock();

        let pending = self.drain_pending();
        let mut worlds = self.worlds();
        for world in pending.keys() {
            if !worlds.contains(world) {
                worlds.push(world.clone());
            }
        }

        self.write_worlds(worlds, pending, true)
    }

    fn drain_pending(&self) -> BTreeMap<String, WorldPending> {
        let writes = std::mem::take(&mut *self.pending_writes.lock());
        let deletes = std::mem::take(&mut *self.pending_deletes.lock());

        let mut by_world: BTreeMap<String, WorldPending> = BTreeMap::new();
        for (id, world) in writes {
            by_world.entry(world).or_default().writes.push(id);
        }
        for (world, id) in deletes {
            by_world.entry(world).or_default().deletes.push(id);
        }
        by_world
    }

    fn restore_pending(&self, world: &str, pending: WorldPending) {
        {
            let mut writes = self.pending_writes.lock();
            for id in pending.writes {
                writes.entry(id).or_insert_with(|| world.to_string());
            }
        }
        let mut deletes = self.pending_deletes.lock();
        deletes.extend(pending.deletes.into_iter().map(|id| (world.to_string(), id)));
    }

    fn write_worlds(
        &self,
        worlds: Vec<String>,
        mut pending: BTreeMap<String, WorldPending>,
        force_counter: bool,
    ) -> CoreResult<FlushOutcome> {
        let mut files = 0;
        let mut first_error = None;

        for world in worlds {
            let drained = pending.remove(&world).unwrap_or_default();
            match self.write_world(&world) {
                Ok(()) => files += 1,
                Err(e) => {
                    warn!(world = %world, error = %e, "failed to save claims");
                    self.restore_pending(&world, drained);
                    first_error.get_or_insert(e);
                }
            }
        }

        match self.write_next_id(force_counter) {
            Ok(true) => files += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "failed to save next claim id");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(FlushOutcome::Written { files }),
        }
    }

    /// Serializes one world: top-level claims first, then sub-claims, each
    /// sorted by id.
    fn write_world(&self, world_name: &str) -> CoreResult<()> {
        let path = self.world_file_path(world_name);
        if self.unreadable.lock().contains(world_name) {
            return Err(CoreError::OverwriteRefused { path });
        }

        let mut records = self.world_claims(world_name);
        records.sort_by_key(|r| (!r.is_top_level(), r.id));

        write_data_file(&path, self.compression, records.iter().map(encode_claim))?;
        debug!(world = world_name, claims = records.len(), "saved claims");
        Ok(())
    }

    /// Persists the counter if it changed, or always when `force` is set.
    /// Returns whether a write happened.
    fn write_next_id(&self, force: bool) -> CoreResult<bool> {
        let next = self.next_id();
        if !force && *self.persisted_next_id.lock() == Some(next) {
            return Ok(false);
        }

        replace_file(&self.next_id_path(), Compression::None, |out| {
            out.write_all(next.to_string().as_bytes())
        })?;
        *self.persisted_next_id.lock() = Some(next);
        Ok(true)
    }
}
