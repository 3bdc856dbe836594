//! Additive schema synchronization for loom-sql table metadata.
//!
//! `loom-migrate` compares declared [`TableMetadata`](loom_sql_core::TableMetadata)
//! with the live database and applies only changes that cannot lose data:
//! - Absent tables are created in one transaction
//! - Missing columns and indexes are added
//! - Missing unique and foreign key constraints are reported as drift, and
//!   only added on request after a preflight query proves the existing
//!   rows satisfy them
//!
//! # Architecture
//!
//! - **Driver** - Executes templates and introspects tables ([`SqliteDriver`])
//! - **Introspection** - The live columns, indexes and constraints of a table
//! - **Drift** - What the live table lacks compared to its metadata
//! - **Preflight** - Read-only violation counts run before adding a constraint
//! - **Sync** - [`SchemaSync::ensure_table`] and [`SchemaSync::ensure_constraints`]
//!
//! # Example
//!
//! ```rust,no_run
//! use loom_migrate::prelude::*;
//! use loom_sql_core::schema::{TableBuilder, integer, text};
//!
//! # async fn run() -> loom_migrate::Result<()> {
//! let users = TableBuilder::new("users")
//!     .field(integer("id").primary().auto_increment())
//!     .field(text("email").unique())
//!     .build()?;
//!
//! let sync = SchemaSync::new(SqliteDriver::connect("sqlite:app.db").await?);
//! let report = sync.ensure_table(&users).await?;
//! println!("created: {}, added columns: {:?}", report.created, report.added_columns);
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the DDL of every table in schema.json
//! loom-migrate ddl --dialect postgres
//!
//! # Report drift, exiting non-zero when any is found
//! loom-migrate check
//!
//! # Create tables and add missing columns and indexes
//! loom-migrate ensure
//!
//! # Also add missing constraints after their preflight checks
//! loom-migrate ensure --constraints
//! ```

pub mod drift;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod preflight;
pub mod schema_file;
pub mod sync;

pub use drift::{Drift, DriftReport, MissingIndex, detect_drift};
pub use driver::{Driver, SqliteDriver};
pub use error::{EnsureStep, MigrateError, Result, ViolationKind};
pub use introspect::{Constraint, ConstraintKind, LiveColumn, LiveIndex, LiveSchema};
pub use sync::{EnsureReport, SchemaSync};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::drift::{DriftReport, detect_drift};
    pub use crate::driver::{Driver, SqliteDriver};
    pub use crate::error::{MigrateError, Result};
    pub use crate::sync::{EnsureReport, SchemaSync};
}
