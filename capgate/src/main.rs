//! capgate - permission catalog operator tool
//!
//! # Commands
//!
//! - `capgate sync`: derive the legal capability set from the configured
//!   entities, reconcile it against the catalog file, and apply the delta.
//! - `capgate legal`: print the derived legal capability set.
//! - `capgate check`: resolve a user's access tier for one operation.
//!
//! # Logging
//!
//! Log output goes to stderr and is filtered by `RUST_LOG`
//! (default `warn`, or `debug` with `--verbose`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capgate::{
    FileCatalogStore, MemoryGrantStore, PermissionConfig, PermissionEngine, Principal, SyncReport,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// capgate - permission catalog operator tool
#[derive(Parser, Debug)]
#[command(name = "capgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize the catalog with the configured entities
    Sync {
        /// Permission config (TOML)
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,

        /// Catalog file (JSON), created if missing
        #[arg(long, value_name = "PATH")]
        catalog: PathBuf,

        /// Report the delta without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the legal capability set
    Legal {
        /// Permission config (TOML)
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Resolve a user's access tier
    Check {
        /// Permission config (TOML)
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,

        /// Catalog file (JSON)
        #[arg(long, value_name = "PATH")]
        catalog: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long)]
        entity: String,

        #[arg(long)]
        action: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<PermissionConfig> {
    PermissionConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn engine_for(
    config: &PermissionConfig,
    catalog: PathBuf,
) -> PermissionEngine<MemoryGrantStore, FileCatalogStore> {
    PermissionEngine::new(
        MemoryGrantStore::from_config(config),
        FileCatalogStore::new(catalog),
    )
}

fn print_report(report: &SyncReport) {
    let verb = if report.dry_run { "would add" } else { "added" };
    println!("{verb} {} capabilities", report.added.len());
    for cap in &report.added {
        println!("  + {cap}");
    }

    let verb = if report.dry_run { "would remove" } else { "removed" };
    println!("{verb} {} capabilities", report.removed.len());
    for cap in &report.removed {
        println!("  - {cap}");
    }
    if !report.removed.is_empty() {
        println!("grants on removed capabilities no longer take effect; re-grant renamed ones");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Sync {
            config,
            catalog,
            dry_run,
        } => {
            let config = load_config(&config)?;
            let engine = engine_for(&config, catalog);
            let registry = config.registry();
            let report = if dry_run {
                engine.preview_sync(&registry)?
            } else {
                engine.synchronize(&registry)?
            };
            print_report(&report);
        }
        Command::Legal { config } => {
            let config = load_config(&config)?;
            for cap in config.registry().legal_permissions() {
                println!("{cap}");
            }
        }
        Command::Check {
            config,
            catalog,
            user,
            entity,
            action,
        } => {
            let config = load_config(&config)?;
            let engine = engine_for(&config, catalog);
            let tier = engine.resolve_access(&Principal::user(user), &entity, &action)?;
            println!("{tier}");
        }
    }

    Ok(())
}
