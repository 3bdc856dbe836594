//! Error types for normalization.

use std::fmt;

use thiserror::Error;

/// A problem with one field of a decoded entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Field name.
    pub field: String,
    /// What is wrong with the value.
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Row data that does not match its table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {table} entity {key}: {}", join_issues(.issues))]
pub struct ValidationError {
    /// Table the row was decoded for.
    pub table: String,
    /// Entity key (`"table:pk"`).
    pub key: String,
    /// Per-field problems, in field order.
    pub issues: Vec<FieldIssue>,
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrmError {
    /// No tables were passed.
    #[error("normalize requires at least one table")]
    NoTables,

    /// Rows carry columns of tables that were not passed.
    #[error("rows reference unregistered tables: {}", .0.join(", "))]
    UnregisteredTables(Vec<String>),

    /// A row failed decoding or validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A non-null foreign key names an entity missing from the rows.
    #[error("{table}.{alias} references {key}, which is not in the result set")]
    DanglingReference {
        /// Referring table.
        table: String,
        /// Reference alias.
        alias: String,
        /// Missing entity key.
        key: String,
    },
}

/// Result type alias for normalization.
pub type Result<T> = std::result::Result<T, OrmError>;
