//! Strict JSONL ingestion for raw telemetry logs
//!
//! Two line formats, one record per line:
//!
//! ```json
//! {"user_id":"u1","timestamp":"2024-09-01T10:00:00Z","project_version":"0.19.8","is_ci":false}
//! {"user_id":"u1","timestamp":"2024-10-05T09:00:00Z","command":"kedro run --pipeline x"}
//! ```
//!
//! Parsing is strict: a malformed line, a blank `user_id`, or an
//! unparseable timestamp aborts the whole file with
//! [`Error::InvalidRow`]. Monthly bucket assignment downstream depends on
//! every timestamp being real; a coerced or dropped row would corrupt it
//! undetectably.

use crate::error::{Error, Result};
use crate::types::{CommandInvocation, Event};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawEvent {
    user_id: String,
    timestamp: String,
    #[serde(default)]
    project_version: Option<String>,
    #[serde(default)]
    is_ci: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawInvocation {
    user_id: String,
    timestamp: String,
    command: String,
}

/// Discover log files matching a glob pattern, sorted for determinism.
pub fn discover(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| Error::Config(format!(
        "invalid glob pattern {:?}: {}",
        pattern, e
    )))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::Source(format!("unreadable glob entry: {}", e)))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    tracing::debug!(pattern, files = paths.len(), "Discovered log files");
    Ok(paths)
}

/// Parse a JSONL file of raw events.
pub fn parse_events(path: &Path) -> Result<Vec<Event>> {
    let content = std::fs::read_to_string(path)?;
    let mut events = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let context = row_context(path, lineno);
        let raw: RawEvent = serde_json::from_str(line).map_err(|e| Error::InvalidRow {
            context: context.clone(),
            message: e.to_string(),
        })?;

        events.push(Event {
            timestamp: parse_timestamp(&raw.timestamp, &context)?,
            user_id: require_user_id(raw.user_id, &context)?,
            project_version: raw.project_version,
            is_ci: raw.is_ci,
        });
    }

    tracing::info!(path = %path.display(), rows = events.len(), "Parsed event log");
    Ok(events)
}

/// Parse a JSONL file of raw command invocations.
pub fn parse_invocations(path: &Path) -> Result<Vec<CommandInvocation>> {
    let content = std::fs::read_to_string(path)?;
    let mut invocations = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let context = row_context(path, lineno);
        let raw: RawInvocation = serde_json::from_str(line).map_err(|e| Error::InvalidRow {
            context: context.clone(),
            message: e.to_string(),
        })?;

        invocations.push(CommandInvocation {
            timestamp: parse_timestamp(&raw.timestamp, &context)?,
            user_id: require_user_id(raw.user_id, &context)?,
            command: raw.command,
        });
    }

    tracing::info!(path = %path.display(), rows = invocations.len(), "Parsed invocation log");
    Ok(invocations)
}

fn row_context(path: &Path, lineno: usize) -> String {
    format!("{}:{}", path.display(), lineno + 1)
}

fn parse_timestamp(raw: &str, context: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidRow {
            context: context.to_string(),
            message: format!("unparseable timestamp {:?}: {}", raw, e),
        })
}

fn require_user_id(user_id: String, context: &str) -> Result<String> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidRow {
            context: context.to_string(),
            message: "missing user_id".to_string(),
        });
    }
    Ok(user_id)
}
