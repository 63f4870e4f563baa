//! Inspect command implementation.

use super::load_stores;
use claimstore_core::{ClaimStore, StorageStats};
use serde::Serialize;
use std::path::Path;

/// Data directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory path.
    pub path: String,
    /// Record counts.
    pub stats: StorageStats,
    /// Next claim id as stored on disk.
    pub stored_next_claim_id: u64,
    /// Next claim id after accounting for every loaded claim.
    pub next_claim_id: u64,
    /// Per-world counts.
    pub worlds: Vec<WorldSummary>,
    /// Number of lines that failed to decode.
    pub skipped_lines: usize,
}

/// Claim counts for a single world file.
#[derive(Debug, Serialize)]
pub struct WorldSummary {
    /// World name (as found in the file name).
    pub name: String,
    /// Top-level claims.
    pub claims: usize,
    /// Sub-claims.
    pub subclaims: usize,
    /// Administrative claims.
    pub admin_claims: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, compressed: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_stores(path, compressed, &[])?;

    let result = InspectResult {
        path: path.display().to_string(),
        stats: StorageStats::collect(&loaded.claims, &loaded.players),
        stored_next_claim_id: loaded.stored_next_id,
        next_claim_id: loaded.claims.next_id(),
        worlds: summarize_worlds(&loaded.claims),
        skipped_lines: loaded.report.skipped.len(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn summarize_worlds(claims: &ClaimStore) -> Vec<WorldSummary> {
    claims
        .worlds()
        .into_iter()
        .map(|name| {
            let records = claims.world_claims(&name);
            let subclaims = records.iter().filter(|r| !r.is_top_level()).count();
            WorldSummary {
                claims: records.len() - subclaims,
                subclaims,
                admin_claims: records
                    .iter()
                    .filter(|r| r.is_top_level() && r.is_admin())
                    .count(),
                name,
            }
        })
        .collect()
}

fn print_text_output(result: &InspectResult) {
    println!("claimstore data directory: {}", result.path);
    println!();
    println!("{}", result.stats);
    println!(
        "Next claim id: {} (stored: {})",
        result.next_claim_id, result.stored_next_claim_id
    );

    if !result.worlds.is_empty() {
        println!();
        println!("Worlds:");
        for world in &result.worlds {
            println!(
                "  {}: {} claims (+{} subclaims, {} admin)",
                world.name, world.claims, world.subclaims, world.admin_claims
            );
        }
    }

    if result.skipped_lines > 0 {
        println!();
        println!(
            "{} malformed lines skipped; run `claimstore verify` for details",
            result.skipped_lines
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimstore_codec::decode_compact_uuid;
    use claimstore_core::{ClaimRecord, Compression, Corner};
    use tempfile::tempdir;

    #[test]
    fn summarizes_each_world() {
        let dir = tempdir().unwrap();
        let claims = ClaimStore::new(dir.path(), Compression::None);
        let owner = decode_compact_uuid("0e4a1c6f3a3e4b7a9c551b9d5bd7a0c1").unwrap();
        let record =
            |id, world: &str| ClaimRecord::new(id, world, Corner::default(), Corner::default());
        claims.mark_dirty(record(1, "a"));
        claims.mark_dirty(record(2, "a").with_parent(1));
        claims.mark_dirty(record(3, "b").with_owner(owner));

        let summary = summarize_worlds(&claims);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "a");
        assert_eq!(
            (summary[0].claims, summary[0].subclaims, summary[0].admin_claims),
            (1, 1, 1)
        );
        assert_eq!((summary[1].claims, summary[1].admin_claims), (1, 0));
    }
}
