//! Event store backed by SQLite
//!
//! Holds the two raw telemetry streams (`events`, `command_invocations`)
//! and exposes them to the pipeline through
//! [`ActivitySource`](crate::source::ActivitySource). Timestamps are
//! stored as RFC 3339 text and parsed strictly on the way out: a row
//! that does not parse fails the run.

use crate::error::{Error, Result};
use crate::source::ActivitySource;
use crate::types::{CommandInvocation, Event};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::schema;

/// Database handle (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply the schema. Idempotent.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Insert a batch of events in one transaction. Returns rows inserted.
    pub fn insert_events(&self, events: &[Event]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO events (user_id, timestamp, project_version, is_ci)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for event in events {
                stmt.execute(params![
                    event.user_id,
                    event.timestamp.to_rfc3339(),
                    event.project_version,
                    event.is_ci,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(rows = events.len(), "Inserted events");
        Ok(events.len())
    }

    /// Insert a batch of command invocations in one transaction.
    pub fn insert_invocations(&self, invocations: &[CommandInvocation]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO command_invocations (user_id, timestamp, command)
                 VALUES (?1, ?2, ?3)",
            )?;
            for invocation in invocations {
                stmt.execute(params![
                    invocation.user_id,
                    invocation.timestamp.to_rfc3339(),
                    invocation.command,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(rows = invocations.len(), "Inserted command invocations");
        Ok(invocations.len())
    }

    /// Number of stored events.
    pub fn event_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Number of stored command invocations.
    pub fn invocation_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM command_invocations", [], |r| r.get(0))?;
        Ok(count)
    }

    fn load_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, timestamp, project_version, is_ci
             FROM events
             ORDER BY timestamp, user_id, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<bool>>(3)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (user_id, raw_ts, project_version, is_ci) = row?;
            let timestamp = parse_timestamp(&raw_ts, "events")?;
            events.push(Event {
                user_id,
                timestamp,
                project_version,
                is_ci,
            });
        }
        Ok(events)
    }

    fn load_invocations(&self) -> Result<Vec<CommandInvocation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, timestamp, command
             FROM command_invocations
             ORDER BY timestamp, user_id, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut invocations = Vec::new();
        for row in rows {
            let (user_id, raw_ts, command) = row?;
            let timestamp = parse_timestamp(&raw_ts, "command_invocations")?;
            invocations.push(CommandInvocation {
                user_id,
                timestamp,
                command,
            });
        }
        Ok(invocations)
    }
}

/// Strict RFC 3339 parse; a malformed stored timestamp fails the run.
fn parse_timestamp(raw: &str, context: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidRow {
            context: context.to_string(),
            message: format!("unparseable timestamp {:?}: {}", raw, e),
        })
}

impl ActivitySource for Database {
    fn events(&self) -> Result<Vec<Event>> {
        self.load_events().map_err(source_error)
    }

    fn command_invocations(&self) -> Result<Vec<CommandInvocation>> {
        self.load_invocations().map_err(source_error)
    }
}

/// Query failures against the store surface as SourceUnavailable;
/// row-level failures keep their InvalidRow identity.
fn source_error(e: Error) -> Error {
    match e {
        Error::Database(db) => Error::Source(db.to_string()),
        other => other,
    }
}
