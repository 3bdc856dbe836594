//! Error types for template composition, rendering and table definitions.

use thiserror::Error;

/// Errors raised by the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A table definition is invalid (bad identifier, duplicate declaration,
    /// reference to an undeclared field, ...).
    #[error("table definition error: {0}")]
    TableDefinition(String),

    /// A composed template is malformed, or carries values where none are
    /// allowed (e.g. a parameter inside DDL).
    #[error("query error: {0}")]
    Query(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
