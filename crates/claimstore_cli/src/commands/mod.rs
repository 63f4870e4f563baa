//! CLI command implementations.

pub mod inspect;
pub mod migrate;
pub mod verify;

use claimstore_core::{
    claim_dir, player_dir, ClaimStore, Compression, LoadReport, PlayerStore, WorldResolver,
};
use std::collections::BTreeSet;
use std::path::Path;

/// Resolves worlds without a running host.
///
/// With no names given every world resolves; otherwise only the listed ones
/// do. The handle is the world name.
#[derive(Debug, Clone, Default)]
pub struct CliWorlds {
    names: BTreeSet<String>,
    accept_any: bool,
}

impl CliWorlds {
    /// Accepts only `names`, or every world if `names` is empty.
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().cloned().collect(),
            accept_any: names.is_empty(),
        }
    }

    /// Adds known names without restricting resolution.
    pub fn with_known(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.names.extend(names);
        self
    }
}

impl WorldResolver for CliWorlds {
    type Handle = String;

    fn resolve_world(&self, name: &str) -> Option<String> {
        (self.accept_any || self.names.contains(name)).then(|| name.to_string())
    }

    fn world_names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

/// Both stores loaded read-only from a data directory.
pub struct LoadedStores {
    /// Claims from every world file found (or requested).
    pub claims: ClaimStore,
    /// Players and groups.
    pub players: PlayerStore,
    /// Id counter as stored in `_nextClaimID`, before loading claim files.
    pub stored_next_id: u64,
    /// Combined load report.
    pub report: LoadReport,
}

/// Loads the stores without locking or writing anything.
///
/// World names are taken from the claim file names, so worlds whose real
/// name contains special characters show up sanitized.
pub fn load_stores(
    path: &Path,
    compressed: bool,
    worlds: &[String],
) -> Result<LoadedStores, Box<dyn std::error::Error>> {
    if !claim_dir(path).is_dir() && !player_dir(path).is_dir() {
        return Err(format!("No claimstore data found at {:?}", path).into());
    }

    let compression = Compression::from_flag(compressed);
    let claims = ClaimStore::new(claim_dir(path), compression);
    let players = PlayerStore::new(player_dir(path), compression);

    claims.load_next_id()?;
    let stored_next_id = claims.next_id();

    let worlds = if worlds.is_empty() {
        claims.discover_world_files()?
    } else {
        worlds.to_vec()
    };

    let mut report = LoadReport::default();
    for world in &worlds {
        report.merge(claims.load_world(world)?);
    }
    report.merge(players.load()?);

    Ok(LoadedStores {
        claims,
        players,
        stored_next_id,
        report,
    })
}
