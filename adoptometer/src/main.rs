//! adoptometer - compute the adoption metrics report
//!
//! Loads configuration, opens the event store, runs the aggregation
//! pipeline, and prints the four output tables.

use adoptometer_core::{pipeline, AdoptionReport, Config, Database};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adoptometer")]
#[command(about = "Compute adoption metrics from CLI telemetry")]
#[command(version)]
struct Args {
    /// Config file path (defaults to the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event store path (defaults to the XDG data location)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Emit only the two activity-derived tables (new users and MAU)
    #[arg(long)]
    adoption_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = adoptometer_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    // Open the event store
    let db_path = args.database.unwrap_or_else(Config::database_path);
    tracing::info!(path = %db_path.display(), "Opening event store");
    let db = Database::open(&db_path).context("failed to open event store")?;
    db.migrate().context("failed to run database migrations")?;

    if args.adoption_only {
        let report =
            pipeline::run_adoption_only(&db, &config).context("failed to compute report")?;
        match args.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => {
                print_new_users(&report.new_users_monthly);
                print_mau(&report.mau_monthly);
            }
        }
        return Ok(());
    }

    let report = pipeline::run(&db, &config).context("failed to compute report")?;
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &AdoptionReport) {
    print_new_users(&report.new_users_monthly);
    print_mau(&report.mau_monthly);
    print_categories("Plugin command usage", &report.plugin_category_mau);
    print_categories("Core command usage", &report.core_category_mau);
}

fn print_new_users(rows: &[adoptometer_core::NewUsersRow]) {
    println!("New users per month");
    if rows.is_empty() {
        println!("  (no qualifying months)");
    }
    for row in rows {
        println!("  {}  {}", row.year_month, row.count);
    }
    println!();
}

fn print_mau(rows: &[adoptometer_core::MauRow]) {
    println!("Monthly active users");
    if rows.is_empty() {
        println!("  (no qualifying months)");
    }
    for row in rows {
        println!("  {}  {}", row.year_month, row.mau);
    }
    println!();
}

fn print_categories(title: &str, rows: &[adoptometer_core::CategoryMauRow]) {
    println!("{} (unique users)", title);
    if rows.is_empty() {
        println!("  (no qualifying invocations)");
    }
    for row in rows {
        println!(
            "  {}  {:<20}  {}",
            row.year_month, row.category_label, row.unique_users
        );
    }
    println!();
}
