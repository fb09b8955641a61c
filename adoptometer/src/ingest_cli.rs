//! adoptometer-ingest - load raw JSONL telemetry logs into the event store
//!
//! Discovers log files via glob patterns, parses them strictly, and
//! inserts the rows. A malformed line anywhere aborts the ingest with a
//! nonzero exit; nothing from the failing file is inserted.

use adoptometer_core::{ingest, Config, Database};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adoptometer-ingest")]
#[command(about = "Load raw telemetry logs into the adoptometer event store")]
#[command(version)]
struct Args {
    /// Config file path (defaults to the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event store path (defaults to the XDG data location)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Glob pattern for event logs (repeatable)
    #[arg(short, long)]
    events: Vec<String>,

    /// Glob pattern for command-invocation logs (repeatable)
    #[arg(short = 'm', long)]
    commands: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = adoptometer_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    if args.events.is_empty() && args.commands.is_empty() {
        anyhow::bail!("nothing to do: pass at least one --events or --commands pattern");
    }

    let db_path = args.database.unwrap_or_else(Config::database_path);
    let db = Database::open(&db_path).context("failed to open event store")?;
    db.migrate().context("failed to run database migrations")?;

    let mut files_processed = 0usize;
    let mut events_inserted = 0usize;
    let mut invocations_inserted = 0usize;

    for pattern in &args.events {
        for path in ingest::discover(pattern).context("failed to discover event logs")? {
            let events = ingest::parse_events(&path)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            events_inserted += db
                .insert_events(&events)
                .with_context(|| format!("failed to store rows from {}", path.display()))?;
            files_processed += 1;
        }
    }

    for pattern in &args.commands {
        for path in ingest::discover(pattern).context("failed to discover command logs")? {
            let invocations = ingest::parse_invocations(&path)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            invocations_inserted += db
                .insert_invocations(&invocations)
                .with_context(|| format!("failed to store rows from {}", path.display()))?;
            files_processed += 1;
        }
    }

    tracing::info!(
        files_processed,
        events_inserted,
        invocations_inserted,
        "Ingest complete"
    );
    println!(
        "Ingested {} file(s): {} event(s), {} invocation(s)",
        files_processed, events_inserted, invocations_inserted
    );
    println!("Store: {}", db_path.display());

    Ok(())
}
