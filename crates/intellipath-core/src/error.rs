//! Centralized error types for record mapping.

use thiserror::Error;

use crate::model::NodeKind;

/// Errors raised while projecting a relational row onto a graph node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{kind} record {}: missing required field '{field}'", .key.as_deref().unwrap_or("<no key>"))]
    MissingField {
        kind: NodeKind,
        key: Option<String>,
        field: &'static str,
    },

    #[error("{kind} record {key}: invalid value for '{field}': {reason}")]
    InvalidField {
        kind: NodeKind,
        key: String,
        field: &'static str,
        reason: String,
    },

    #[error("{record} {row}")]
    Unreadable { record: &'static str, row: RowError },
}

/// A source row whose columns do not fit the expected row shape.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {}: {reason}", .key.as_deref().unwrap_or("<no key>"))]
pub struct RowError {
    /// Natural key, when it could still be read from the raw row.
    pub key: Option<String>,
    pub reason: String,
}

/// Result type for record mapping.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a missing field error.
    pub fn missing(kind: NodeKind, key: Option<&str>, field: &'static str) -> Self {
        Self::MissingField {
            kind,
            key: key.map(str::to_string),
            field,
        }
    }
}
