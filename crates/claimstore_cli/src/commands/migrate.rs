//! Migration commands.

use super::CliWorlds;
use claimstore_core::{
    claim_dir, ClaimStore, Compression, Config, Engine, LegacyScan, MigrationState, Persistence,
    StorageMigrator,
};
use std::path::Path;
use tracing::info;

/// Show whether legacy data is present and what would be migrated.
pub fn status(root: &Path, worlds: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    info!("Checking migration status for {:?}", root);

    let migrator = StorageMigrator::new(root);
    let state = migrator.detect()?;

    println!("Migration Status");
    println!("================");
    match state {
        MigrationState::NotNeeded => {
            println!("  No legacy data found.");
        }
        MigrationState::Needed => {
            println!("  Legacy data found.");
            print_scan(&migrator.scan(&CliWorlds::new(worlds))?);
            println!("  Next backup suffix: {}", migrator.next_backup_suffix());
        }
    }

    Ok(())
}

/// Migrate legacy data into compact storage.
pub fn run(
    root: &Path,
    compressed: bool,
    worlds: &[String],
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running migration for {:?}", root);

    let migrator = StorageMigrator::new(root);
    if migrator.detect()? == MigrationState::NotNeeded {
        println!("No legacy data found. Nothing to migrate.");
        return Ok(());
    }

    if dry_run {
        println!("Dry run - the following would be migrated:");
        print_scan(&migrator.scan(&CliWorlds::new(worlds))?);
        println!(
            "  Legacy directories would move to *_backup{}",
            migrator.next_backup_suffix()
        );
        return Ok(());
    }

    // Compact files already present are loaded first so they survive the
    // archive step.
    let existing = ClaimStore::new(claim_dir(root), Compression::from_flag(compressed))
        .discover_world_files()?;
    let resolver = CliWorlds::new(worlds).with_known(existing);

    let config = Config::default()
        .compression(compressed)
        .create_if_missing(false);
    let engine = Engine::open(root, config, resolver)?;

    match engine.migration_report() {
        Some(report) => {
            println!("Migration complete!");
            println!("  Claims:  {}", report.claims);
            println!("  Players: {}", report.players);
            println!("  Groups:  {}", report.groups);
            println!("  Legacy data archived with suffix _backup{}", report.backup_suffix);
            if !report.skipped_files.is_empty() {
                println!("  Skipped files:");
                for path in &report.skipped_files {
                    println!("    {}", path.display());
                }
            }
        }
        None => println!("Nothing was migrated."),
    }

    engine.close()?;
    Ok(())
}

fn print_scan(scan: &LegacyScan) {
    println!("  Claims:  {}", scan.claims.len());
    println!("  Players: {}", scan.players.len());
    println!("  Groups:  {}", scan.groups.len());
    println!("  Next claim id: {}", scan.next_id());
    if !scan.skipped_files.is_empty() {
        println!("  Files that would be skipped:");
        for path in &scan.skipped_files {
            println!("    {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn legacy_root() -> tempfile::TempDir {
        let root = tempdir().unwrap();
        let claims = root.path().join("ClaimData");
        fs::create_dir_all(&claims).unwrap();
        fs::write(
            claims.join("4.yml"),
            "Lesser Boundary Corner: Skyblock;0;0;0\nGreater Boundary Corner: Skyblock;8;8;8\n",
        )
        .unwrap();
        root
    }

    #[test]
    fn dry_run_changes_nothing() {
        let root = legacy_root();
        run(root.path(), false, &[], true).unwrap();
        assert!(root.path().join("ClaimData/4.yml").is_file());
        assert!(!root.path().join("ClaimData_backup1").exists());
    }

    #[test]
    fn run_migrates_any_world_by_default() {
        let root = legacy_root();
        run(root.path(), false, &[], false).unwrap();

        assert!(root.path().join("ClaimData_backup1/4.yml").is_file());
        let text = fs::read_to_string(root.path().join("ClaimData/claims_Skyblock.dat")).unwrap();
        assert!(text.starts_with("V:1\n4||0,0,0,8,8,8|-1|0|"));

        run(root.path(), false, &[], false).unwrap();
        assert!(!root.path().join("ClaimData_backup2").exists());
    }

    #[test]
    fn world_filter_skips_other_worlds() {
        let root = legacy_root();
        run(root.path(), false, &["world".to_string()], false).unwrap();
        assert!(root.path().join("ClaimData_backup1/4.yml").is_file());
        assert!(!root.path().join("ClaimData/claims_Skyblock.dat").exists());
    }
}
