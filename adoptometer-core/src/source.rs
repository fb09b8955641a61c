//! Data-access seam for the aggregation pipeline
//!
//! The pipeline never manages connection lifecycle itself; it receives a
//! source of already-queryable rows through the [`ActivitySource`] trait.
//! The bundled implementations are [`InMemorySource`] (tests, embedding)
//! and [`Database`](crate::db::Database) (the SQLite event store).

use crate::error::Result;
use crate::types::{CommandInvocation, Event};

/// A queryable source of raw telemetry rows.
///
/// Implementations should surface connection or auth failures as
/// [`Error::Source`](crate::Error::Source) and rows with unparseable
/// timestamps or missing required fields as
/// [`Error::InvalidRow`](crate::Error::InvalidRow).
pub trait ActivitySource {
    /// All raw tool-usage events.
    fn events(&self) -> Result<Vec<Event>>;

    /// All raw command invocations.
    fn command_invocations(&self) -> Result<Vec<CommandInvocation>>;
}

/// In-memory tabular source, for tests and in-process embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    events: Vec<Event>,
    invocations: Vec<CommandInvocation>,
}

impl InMemorySource {
    pub fn new(events: Vec<Event>, invocations: Vec<CommandInvocation>) -> Self {
        Self {
            events,
            invocations,
        }
    }
}

impl ActivitySource for InMemorySource {
    fn events(&self) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    fn command_invocations(&self) -> Result<Vec<CommandInvocation>> {
        Ok(self.invocations.clone())
    }
}
