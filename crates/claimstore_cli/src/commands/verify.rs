//! Verify command implementation.

use super::{load_stores, CliWorlds, LoadedStores};
use std::collections::BTreeMap;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of records loaded.
    pub records_checked: usize,
    /// Problems that make the data directory unsafe to trust.
    pub errors: Vec<String>,
    /// Problems the engine repairs on its own.
    pub warnings: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path, compressed: bool, worlds: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying data directory at {:?}", path);
    println!();

    let result = match load_stores(path, compressed, worlds) {
        Ok(loaded) => check(&loaded),
        Err(e) => VerifyResult {
            errors: vec![e.to_string()],
            ..VerifyResult::default()
        },
    };

    println!("  Records checked: {}", result.records_checked);
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
    for error in &result.errors {
        println!("  error: {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Data verification passed");
        Ok(())
    } else {
        println!("✗ Data verification failed");
        Err("Verification failed".into())
    }
}

fn check(loaded: &LoadedStores) -> VerifyResult {
    let mut result = VerifyResult {
        records_checked: loaded.report.loaded,
        ..VerifyResult::default()
    };

    for skipped in &loaded.report.skipped {
        result.errors.push(format!(
            "{}:{}: {}",
            skipped.path.display(),
            skipped.line,
            skipped.error
        ));
    }

    let mut seen: BTreeMap<u64, String> = BTreeMap::new();
    for record in loaded.claims.all_claims() {
        if let Some(other) = seen.insert(record.id, record.world_name.clone()) {
            result.errors.push(format!(
                "claim {} appears in both '{}' and '{}'",
                record.id, other, record.world_name
            ));
        }
    }

    let active = loaded.claims.resolve_active(&CliWorlds::new(&[]));
    for id in &active.orphans {
        result
            .warnings
            .push(format!("claim {} has a missing or cyclic parent", id));
    }

    let next_id = loaded.claims.next_id();
    if next_id > loaded.stored_next_id {
        result.warnings.push(format!(
            "claim id counter is {} but claims up to {} exist",
            loaded.stored_next_id,
            next_id - 1
        ));
    }

    result
}
