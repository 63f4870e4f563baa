//! Test fixtures and data directory helpers.
//!
//! Provides temporary data directories, engine helpers and a builder for the
//! legacy one-file-per-entity layout.

use claimstore_core::{
    claim_dir, player_dir, ClaimRecord, ClaimStore, Compression, Config, Corner, Engine,
    PlayerStore, StaticWorlds,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// A temporary data directory with automatic cleanup.
pub struct TestDataDir {
    temp_dir: TempDir,
}

impl TestDataDir {
    /// Creates an empty temporary data directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the data directory root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the claim directory.
    pub fn claim_dir(&self) -> PathBuf {
        claim_dir(self.path())
    }

    /// Returns the player directory.
    pub fn player_dir(&self) -> PathBuf {
        player_dir(self.path())
    }

    /// Opens an engine with the default configuration over `worlds`.
    pub fn open(&self, worlds: &[&str]) -> Engine<StaticWorlds> {
        self.open_with_config(worlds, Config::default())
    }

    /// Opens an engine with a custom configuration.
    pub fn open_with_config(&self, worlds: &[&str], config: Config) -> Engine<StaticWorlds> {
        Engine::open(self.path(), config, StaticWorlds::new(worlds.iter().copied()))
            .expect("Failed to open engine")
    }

    /// Creates a claim store over this directory without an engine.
    pub fn claim_store(&self, compression: Compression) -> ClaimStore {
        fs::create_dir_all(self.claim_dir()).expect("Failed to create claim directory");
        ClaimStore::new(self.claim_dir(), compression)
    }

    /// Creates a player store over this directory without an engine.
    pub fn player_store(&self, compression: Compression) -> PlayerStore {
        fs::create_dir_all(self.player_dir()).expect("Failed to create player directory");
        PlayerStore::new(self.player_dir(), compression)
    }

    /// Reads a file under the root as text.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).expect("Failed to read file")
    }

    /// Writes a file under the root, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(path, contents).expect("Failed to write file");
    }
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a claim with a 10x10 footprint at the given corner.
pub fn sample_claim(id: u64, world: &str, x: i32, z: i32) -> ClaimRecord {
    ClaimRecord::new(
        id,
        world,
        Corner::new(x, 0, z),
        Corner::new(x + 9, 255, z + 9),
    )
}

/// A claim in the legacy YAML layout.
#[derive(Debug, Clone)]
pub struct LegacyClaim {
    /// Claim id (the file name).
    pub id: u64,
    /// World name as written in the corners.
    pub world: String,
    /// Lesser corner.
    pub lesser: Corner,
    /// Greater corner.
    pub greater: Corner,
    /// Owner as written; `None` omits the key.
    pub owner: Option<String>,
    /// Parent claim id; `None` omits the key.
    pub parent_id: Option<i64>,
    /// `inheritNothing` flag.
    pub inherit_nothing: bool,
    /// Builder entries.
    pub builders: Vec<String>,
    /// Container entries.
    pub containers: Vec<String>,
    /// Accessor entries.
    pub accessors: Vec<String>,
    /// Manager entries.
    pub managers: Vec<String>,
}

impl LegacyClaim {
    /// Creates an administrative top-level claim.
    pub fn new(id: u64, world: &str, lesser: Corner, greater: Corner) -> Self {
        Self {
            id,
            world: world.to_string(),
            lesser,
            greater,
            owner: None,
            parent_id: None,
            inherit_nothing: false,
            builders: Vec::new(),
            containers: Vec::new(),
            accessors: Vec::new(),
            managers: Vec::new(),
        }
    }

    /// Sets the owner.
    pub fn owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner.hyphenated().to_string());
        self
    }

    /// Sets the parent claim id.
    pub fn parent(mut self, parent: i64) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Adds a builder entry.
    pub fn builder(mut self, entry: &str) -> Self {
        self.builders.push(entry.to_string());
        self
    }

    /// Adds a manager entry.
    pub fn manager(mut self, entry: &str) -> Self {
        self.managers.push(entry.to_string());
        self
    }

    /// Renders the claim as a YAML document.
    pub fn to_yaml(&self) -> String {
        let corner = |c: &Corner| format!("{};{};{};{}", self.world, c.x, c.y, c.z);
        let list = |key: &str, entries: &[String]| {
            if entries.is_empty() {
                format!("{key}: []\n")
            } else {
                let items: String = entries.iter().map(|e| format!("- '{e}'\n")).collect();
                format!("{key}:\n{items}")
            }
        };

        let mut doc = String::new();
        doc.push_str(&format!("Lesser Boundary Corner: {}\n", corner(&self.lesser)));
        doc.push_str(&format!("Greater Boundary Corner: {}\n", corner(&self.greater)));
        if let Some(owner) = &self.owner {
            doc.push_str(&format!("Owner: '{owner}'\n"));
        }
        doc.push_str(&list("Builders", &self.builders));
        doc.push_str(&list("Containers", &self.containers));
        doc.push_str(&list("Accessors", &self.accessors));
        doc.push_str(&list("Managers", &self.managers));
        if let Some(parent) = self.parent_id {
            doc.push_str(&format!("Parent Claim ID: {parent}\n"));
        }
        doc.push_str(&format!("inheritNothing: {}\n", self.inherit_nothing));
        doc
    }
}

/// Builder for a data directory in the legacy layout.
#[derive(Debug, Clone, Default)]
pub struct LegacyLayout {
    claims: Vec<LegacyClaim>,
    players: Vec<(Uuid, i32, i32)>,
    groups: Vec<(String, i32)>,
    next_claim_id: Option<u64>,
    extra_files: Vec<(String, String)>,
}

impl LegacyLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a claim document.
    pub fn claim(mut self, claim: LegacyClaim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Adds a player file.
    pub fn player(mut self, uuid: Uuid, accrued: i32, bonus: i32) -> Self {
        self.players.push((uuid, accrued, bonus));
        self
    }

    /// Adds a `$<group>` file.
    pub fn group(mut self, name: &str, bonus: i32) -> Self {
        self.groups.push((name.to_string(), bonus));
        self
    }

    /// Writes the legacy `_nextClaimID` file.
    pub fn next_claim_id(mut self, next: u64) -> Self {
        self.next_claim_id = Some(next);
        self
    }

    /// Adds an arbitrary file, relative to the root.
    pub fn file(mut self, relative: &str, contents: &str) -> Self {
        self.extra_files
            .push((relative.to_string(), contents.to_string()));
        self
    }

    /// Writes every file under `dir`.
    pub fn write_to(&self, dir: &TestDataDir) {
        fs::create_dir_all(dir.claim_dir()).expect("Failed to create claim directory");
        fs::create_dir_all(dir.player_dir()).expect("Failed to create player directory");

        for claim in &self.claims {
            dir.write(&format!("ClaimData/{}.yml", claim.id), &claim.to_yaml());
        }
        if let Some(next) = self.next_claim_id {
            dir.write("ClaimData/_nextClaimID", &next.to_string());
        }
        for (uuid, accrued, bonus) in &self.players {
            // First line held a login timestamp in the legacy layout.
            dir.write(
                &format!("PlayerData/{}", uuid.hyphenated()),
                &format!("\n{accrued}\n{bonus}\n\n"),
            );
        }
        for (name, bonus) in &self.groups {
            dir.write(&format!("PlayerData/${name}"), &format!("{bonus}\n"));
        }
        for (relative, contents) in &self.extra_files {
            dir.write(relative, contents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimstore_core::{legacy, MigrationState, StorageMigrator};

    #[test]
    fn legacy_claim_renders_parseable_yaml() {
        let owner = Uuid::new_v4();
        let claim = LegacyClaim::new(3, "world", Corner::new(0, 0, 0), Corner::new(4, 4, 4))
            .owner(owner)
            .parent(1)
            .builder("[vip]")
            .manager(&owner.hyphenated().to_string());

        let record =
            legacy::parse_claim_document(&claim.to_yaml(), 3, &StaticWorlds::new(["world"]))
                .unwrap();
        assert_eq!(record.owner, Some(owner));
        assert_eq!(record.parent(), Some(1));
        assert_eq!(record.builders.len(), 1);
        assert_eq!(record.managers.len(), 1);
    }

    #[test]
    fn layout_is_detected() {
        let dir = TestDataDir::new();
        LegacyLayout::new()
            .player(Uuid::new_v4(), 10, 0)
            .write_to(&dir);
        assert_eq!(
            StorageMigrator::new(dir.path()).detect().unwrap(),
            MigrationState::Needed
        );
    }
}
