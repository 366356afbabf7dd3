//! Error types for the ITAS harness support library

use thiserror::Error;

/// Result type alias using the harness Error
pub type Result<T> = std::result::Result<T, Error>;

/// Harness support error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database client is not available")]
    ConnectionUnavailable,

    #[error("Query failed for key \"{key}\": {reason}")]
    Query { key: String, reason: String },

    #[error("No value bound for query parameter @{0}")]
    UnboundParameter(String),

    #[error("No stored result for key \"{0}\"")]
    ResultNotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}
