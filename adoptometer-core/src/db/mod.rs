//! SQLite-backed event store
//!
//! The store is deliberately dumb: two append-only tables of raw rows,
//! loaded in full by the pipeline. All aggregation happens in
//! [`pipeline`](crate::pipeline), not in SQL, so a run stays a pure
//! function of its inputs.

mod repo;
mod schema;

pub use repo::Database;
