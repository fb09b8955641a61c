//! SQLite schema for the event store
//!
//! Two append-only tables mirroring the raw telemetry streams. Timestamps
//! are stored as RFC 3339 text; `is_ci` is a nullable boolean.

/// Schema DDL, applied idempotently by [`Database::migrate`](super::Database::migrate).
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    project_version TEXT,
    is_ci           INTEGER
);

CREATE INDEX IF NOT EXISTS idx_events_user_time
    ON events (user_id, timestamp);

CREATE TABLE IF NOT EXISTS command_invocations (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    command   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invocations_user_time
    ON command_invocations (user_id, timestamp);
"#;
