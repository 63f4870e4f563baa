//! claimstore CLI
//!
//! Command-line tools for claimstore data directories.
//!
//! # Commands
//!
//! - `inspect` - Display record counts per world
//! - `verify` - Check every data file for malformed records
//! - `migrate status` - Report legacy files awaiting migration
//! - `migrate run` - Migrate legacy files into compact storage

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// claimstore command-line tools.
#[derive(Parser)]
#[command(name = "claimstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory (the one holding ClaimData/ and PlayerData/)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Data files are gzip-compressed
    #[arg(global = true, short, long)]
    compressed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display record counts per world
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify data file integrity
    Verify {
        /// Only check these worlds (default: every claim file found)
        #[arg(short, long)]
        world: Vec<String>,
    },

    /// Legacy data migration
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Show whether legacy files are present and what they contain
    Status {
        /// Accept only claims in these worlds (default: any world)
        #[arg(short, long)]
        world: Vec<String>,
    },

    /// Migrate legacy files and archive them
    Run {
        /// Accept only claims in these worlds (default: any world)
        #[arg(short, long)]
        world: Vec<String>,

        /// Dry run - show what would be migrated
        #[arg(short, long)]
        dry_run: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Data path required for inspect")?;
            commands::inspect::run(&path, cli.compressed, &format)?;
        }
        Commands::Verify { world } => {
            let path = cli.path.ok_or("Data path required for verify")?;
            commands::verify::run(&path, cli.compressed, &world)?;
        }
        Commands::Migrate { action } => {
            let path = cli.path.ok_or("Data path required for migrate")?;
            match action {
                MigrateAction::Status { world } => commands::migrate::status(&path, &world)?,
                MigrateAction::Run { world, dry_run } => {
                    commands::migrate::run(&path, cli.compressed, &world, dry_run)?;
                }
            }
        }
        Commands::Version => {
            println!("claimstore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("claimstore core v{}", claimstore_core::VERSION);
            println!("data format v{}", claimstore_codec::FORMAT_VERSION);
        }
    }

    Ok(())
}
