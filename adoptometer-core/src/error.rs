//! Error types for adoptometer-core

use thiserror::Error;

/// Main error type for the adoptometer-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event/command source cannot be queried.
    ///
    /// Fatal: no partial output is produced.
    #[error("source unavailable: {0}")]
    Source(String),

    /// A stored or ingested row with an unparseable timestamp or missing
    /// required field. Strict by design: silently dropping or coercing a
    /// row would corrupt monthly bucket assignment undetectably.
    #[error("invalid row in {context}: {message}")]
    InvalidRow { context: String, message: String },

    /// Configuration error, raised before any query executes
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for adoptometer-core
pub type Result<T> = std::result::Result<T, Error>;
