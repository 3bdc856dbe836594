//! Live schema model read back from the database.

use crate::driver::Driver;
use crate::error::Result;

/// A column as the database reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Declared SQL type.
    pub sql_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Default expression, verbatim.
    pub default: Option<String>,
}

/// An index as the database reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
    /// Indexed columns, in index order.
    pub columns: Vec<String>,
    /// Whether the index is unique.
    pub unique: bool,
}

/// Kind of a live constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// PRIMARY KEY.
    PrimaryKey,
    /// UNIQUE, whether declared as a constraint or a unique index.
    Unique,
    /// FOREIGN KEY.
    ForeignKey,
    /// CHECK.
    Check,
}

/// A constraint as the database reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Name, when the database keeps one.
    pub name: Option<String>,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table, for foreign keys.
    pub references_table: Option<String>,
    /// Referenced columns, for foreign keys. Empty when the database
    /// leaves them implicit.
    pub references_columns: Vec<String>,
}

impl Constraint {
    /// Creates a constraint without a reference.
    #[must_use]
    pub fn new(kind: ConstraintKind, name: Option<String>, columns: Vec<String>) -> Self {
        Self {
            kind,
            name,
            columns,
            references_table: None,
            references_columns: Vec::new(),
        }
    }

    /// Creates a foreign key constraint.
    #[must_use]
    pub fn foreign_key(
        name: Option<String>,
        columns: Vec<String>,
        references_table: impl Into<String>,
        references_columns: Vec<String>,
    ) -> Self {
        Self {
            kind: ConstraintKind::ForeignKey,
            name,
            columns,
            references_table: Some(references_table.into()),
            references_columns,
        }
    }
}

/// Everything known about one live table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveSchema {
    /// Table name.
    pub table: String,
    /// Columns in table order.
    pub columns: Vec<LiveColumn>,
    /// Indexes, including the ones backing constraints.
    pub indexes: Vec<LiveIndex>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
}

impl LiveSchema {
    /// Returns `false` when the table has no columns, i.e. does not exist.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks an index up by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&LiveIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns `true` when the columns are covered by a primary key, a
    /// unique constraint or a unique index with exactly these columns.
    #[must_use]
    pub fn has_unique(&self, columns: &[String]) -> bool {
        self.constraints.iter().any(|c| {
            matches!(c.kind, ConstraintKind::Unique | ConstraintKind::PrimaryKey)
                && c.columns == columns
        }) || self
            .indexes
            .iter()
            .any(|i| i.unique && i.columns == columns)
    }

    /// Returns `true` when a foreign key over `columns` points at
    /// `references_table`.
    #[must_use]
    pub fn has_foreign_key(&self, columns: &[String], references_table: &str) -> bool {
        self.constraints.iter().any(|c| {
            c.kind == ConstraintKind::ForeignKey
                && c.columns == columns
                && c.references_table.as_deref() == Some(references_table)
        })
    }

    /// Returns `true` when an index with this name exists, or a plain index
    /// over exactly these columns does.
    #[must_use]
    pub fn has_index(&self, name: &str, columns: &[String]) -> bool {
        self.indexes
            .iter()
            .any(|i| i.name == name || (!i.unique && i.columns == columns))
    }
}

/// Reads the live columns, indexes and constraints of a table.
pub async fn inspect<D: Driver>(driver: &D, table: &str) -> Result<LiveSchema> {
    let columns = driver.list_columns(table).await?;
    if columns.is_empty() {
        return Ok(LiveSchema {
            table: String::from(table),
            ..LiveSchema::default()
        });
    }
    let indexes = driver.list_indexes(table).await?;
    let constraints = driver.list_constraints(table).await?;
    Ok(LiveSchema {
        table: String::from(table),
        columns,
        indexes,
        constraints,
    })
}
