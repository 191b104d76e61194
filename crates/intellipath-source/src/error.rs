//! Relational source error types.

use thiserror::Error;

/// Errors raised while reading from the relational source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source API error on '{table}' ({status}): {body}")]
    Api {
        table: String,
        status: u16,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
