//! # adoptometer-core
//!
//! Core library for adoptometer - an adoption metrics aggregator for CLI
//! tool telemetry.
//!
//! This library provides:
//! - Domain types for raw events and derived metric tables
//! - A dependency-injected data-access seam ([`ActivitySource`]) with a
//!   bundled SQLite event store
//! - The five-stage aggregation pipeline deriving sustained users and
//!   the four monthly metric tables
//! - Strict JSONL ingestion for raw telemetry logs
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Raw:** immutable event and command-invocation rows, supplied by an
//!   [`ActivitySource`]
//! - **Derived:** daily activity, user lifespans, and the sustained-user
//!   set, recomputed fresh on every run
//! - **Report:** the four output tables, a pure function of raw rows and
//!   configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use adoptometer_core::{pipeline, Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open event store");
//! db.migrate().expect("failed to run migrations");
//!
//! let report = pipeline::run(&db, &config).expect("failed to compute report");
//! for row in &report.mau_monthly {
//!     println!("{} {}", row.year_month, row.mau);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use source::{ActivitySource, InMemorySource};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub mod types;
