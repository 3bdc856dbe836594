//! Database access used by schema synchronization.
//!
//! A [`Driver`] executes rendered templates and reports the live schema of
//! a table. [`SqliteDriver`] is the bundled implementation; other databases
//! plug in by implementing the trait.

mod sqlite;

pub use sqlite::SqliteDriver;

use std::future::Future;

use loom_sql_core::{Dialect, Row, SqlValue, Template};

use crate::error::Result;
use crate::introspect::{Constraint, LiveColumn, LiveIndex};

/// A database connection able to run templates and introspect tables.
pub trait Driver: Send + Sync {
    /// Returns the dialect templates are rendered for.
    fn dialect(&self) -> Dialect;

    /// Runs a query and returns every row, keyed by column label.
    fn fetch_rows(&self, query: &Template) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, statement: &Template) -> impl Future<Output = Result<u64>> + Send;

    /// Runs a query and returns the first column of the first row.
    fn fetch_scalar(
        &self,
        query: &Template,
    ) -> impl Future<Output = Result<Option<SqlValue>>> + Send;

    /// Runs statements in one transaction. Nothing is applied unless every
    /// statement succeeds.
    fn transaction(&self, statements: &[Template]) -> impl Future<Output = Result<u64>> + Send;

    /// Lists the columns of a table. Empty when the table does not exist.
    fn list_columns(&self, table: &str) -> impl Future<Output = Result<Vec<LiveColumn>>> + Send;

    /// Lists the indexes of a table.
    fn list_indexes(&self, table: &str) -> impl Future<Output = Result<Vec<LiveIndex>>> + Send;

    /// Lists the constraints of a table.
    fn list_constraints(
        &self,
        table: &str,
    ) -> impl Future<Output = Result<Vec<Constraint>>> + Send;
}
