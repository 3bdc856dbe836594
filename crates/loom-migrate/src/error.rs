//! Error types for schema synchronization.

use std::fmt;
use std::path::PathBuf;

use loom_sql_core::{CoreError, Dialect};

use crate::drift::Drift;
use crate::sync::EnsureReport;

/// Kind of a live constraint violation reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// UNIQUE or PRIMARY KEY.
    Unique,
    /// FOREIGN KEY.
    ForeignKey,
    /// CHECK.
    Check,
    /// NOT NULL.
    NotNull,
    /// The driver did not say.
    Unknown,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign_key",
            Self::Check => "check",
            Self::NotNull => "not_null",
            Self::Unknown => "unknown",
        })
    }
}

/// Numbered steps of an ensure operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureStep {
    /// 1: read the live columns, indexes and constraints.
    Introspect,
    /// 2: create the absent table.
    CreateTable,
    /// 3: add a missing column.
    AddColumn,
    /// 4: create a missing index.
    CreateIndex,
    /// 5: run a constraint preflight query.
    Preflight,
    /// 6: add a unique index or foreign key.
    AddConstraint,
}

impl EnsureStep {
    /// Returns the step number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Introspect => 1,
            Self::CreateTable => 2,
            Self::AddColumn => 3,
            Self::CreateIndex => 4,
            Self::Preflight => 5,
            Self::AddConstraint => 6,
        }
    }
}

impl fmt::Display for EnsureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Introspect => "introspect",
            Self::CreateTable => "create table",
            Self::AddColumn => "add column",
            Self::CreateIndex => "create index",
            Self::Preflight => "preflight",
            Self::AddConstraint => "add constraint",
        };
        write!(f, "step {} ({name})", self.number())
    }
}

/// Errors that can occur during schema synchronization.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Template or table definition error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error the driver could not classify.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A live constraint rejected a statement.
    #[error(
        "{kind} constraint violated{}{}: {message}",
        table.as_ref().map(|t| format!(" on {t}")).unwrap_or_default(),
        column.as_ref().map(|c| format!(".{c}")).unwrap_or_default()
    )]
    ConstraintViolation {
        /// Violation kind.
        kind: ViolationKind,
        /// Table, when reported.
        table: Option<String>,
        /// Column, when reported.
        column: Option<String>,
        /// Constraint name, when reported.
        constraint: Option<String>,
        /// Driver message.
        message: String,
    },

    /// The live table lacks a declared constraint.
    #[error("Schema drift on '{table}': {drift}. {remediation}")]
    SchemaDrift {
        /// Table name.
        table: String,
        /// What is missing.
        drift: Drift,
        /// How to fix it.
        remediation: String,
        /// Columns and indexes added before the drift was found.
        applied: Box<EnsureReport>,
    },

    /// Existing rows would violate a constraint about to be added.
    #[error(
        "Cannot add {constraint} on '{table}': {violations} violation(s) found by `{query}`"
    )]
    ConstraintPreflight {
        /// Table name.
        table: String,
        /// Constraint description.
        constraint: String,
        /// Number of violating groups or rows.
        violations: i64,
        /// Diagnostic query, ready to run.
        query: String,
    },

    /// The dialect cannot perform the operation.
    #[error("{operation} is not supported on {dialect}: {hint}")]
    Unsupported {
        /// Dialect.
        dialect: Dialect,
        /// Operation attempted.
        operation: String,
        /// What to do instead.
        hint: String,
    },

    /// A step of an ensure operation failed.
    #[error("ensure '{table}' failed at {step}: {source}")]
    Ensure {
        /// Table name.
        table: String,
        /// Step that failed.
        step: EnsureStep,
        /// Underlying error.
        source: Box<MigrateError>,
    },

    /// The table model file is invalid.
    #[error("Invalid schema file '{path}': {message}")]
    SchemaFile {
        /// Path to the file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Tags an error with the step it happened in. Drift, preflight and
    /// unsupported errors already carry their context, and unclassified
    /// database errors pass through untouched.
    #[must_use]
    pub fn at_step(self, table: &str, step: EnsureStep) -> Self {
        match self {
            Self::Database(_)
            | Self::SchemaDrift { .. }
            | Self::ConstraintPreflight { .. }
            | Self::Unsupported { .. }
            | Self::Ensure { .. } => self,
            other => Self::Ensure {
                table: String::from(table),
                step,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for schema synchronization.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(EnsureStep::Introspect.to_string(), "step 1 (introspect)");
        assert_eq!(EnsureStep::AddConstraint.number(), 6);
    }

    #[test]
    fn test_at_step_wraps_unclassified_errors() {
        let err = MigrateError::ConstraintViolation {
            kind: ViolationKind::NotNull,
            table: Some(String::from("users")),
            column: Some(String::from("email")),
            constraint: None,
            message: String::from("NOT NULL constraint failed: users.email"),
        }
        .at_step("users", EnsureStep::AddColumn);

        match &err {
            MigrateError::Ensure { table, step, .. } => {
                assert_eq!(table, "users");
                assert_eq!(*step, EnsureStep::AddColumn);
            }
            other => panic!("expected a tagged error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("ensure 'users' failed at step 3"));

        // tagging twice keeps the first step
        let again = err.at_step("users", EnsureStep::CreateIndex);
        assert!(matches!(
            again,
            MigrateError::Ensure {
                step: EnsureStep::AddColumn,
                ..
            }
        ));
    }

    #[test]
    fn test_at_step_keeps_contextual_errors() {
        let err = MigrateError::ConstraintPreflight {
            table: String::from("users"),
            constraint: String::from("uq_users_email"),
            violations: 2,
            query: String::from("SELECT 1"),
        }
        .at_step("users", EnsureStep::Preflight);
        assert!(matches!(err, MigrateError::ConstraintPreflight { .. }));
    }
}
