//! Comparison of declared table metadata with the live schema.

use std::fmt;

use loom_sql_core::ddl::index_name;
use loom_sql_core::schema::{Field, OnDelete, TableMetadata};

use crate::introspect::LiveSchema;

/// A declared constraint the live table lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// A unique constraint over these columns.
    MissingUnique {
        /// Constrained columns.
        columns: Vec<String>,
    },
    /// A foreign key over these columns.
    MissingForeignKey {
        /// Local columns.
        columns: Vec<String>,
        /// Referenced table.
        references_table: String,
        /// Referenced columns.
        references_columns: Vec<String>,
        /// Declared `ON DELETE` action.
        on_delete: Option<OnDelete>,
    },
}

impl Drift {
    /// Returns the local columns.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::MissingUnique { columns } | Self::MissingForeignKey { columns, .. } => columns,
        }
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUnique { columns } if columns.len() == 1 => {
                write!(f, "missing unique on column {}", columns[0])
            }
            Self::MissingUnique { columns } => {
                write!(f, "missing unique on columns ({})", columns.join(", "))
            }
            Self::MissingForeignKey {
                columns,
                references_table,
                references_columns,
                ..
            } => write!(
                f,
                "missing foreign key on {} referencing {references_table}({})",
                columns.join(", "),
                references_columns.join(", ")
            ),
        }
    }
}

/// A declared index the live table lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingIndex {
    /// Index name to create.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
}

/// Everything the live table lacks compared to its metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriftReport {
    /// Table name.
    pub table: String,
    /// Declared fields with no live column.
    pub missing_columns: Vec<Field>,
    /// Declared indexes with no live counterpart.
    pub missing_indexes: Vec<MissingIndex>,
    /// Declared constraints with no live counterpart.
    pub missing_constraints: Vec<Drift>,
}

impl DriftReport {
    /// Returns `true` when nothing is missing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_columns.is_empty()
            && self.missing_indexes.is_empty()
            && self.missing_constraints.is_empty()
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{}: in sync", self.table);
        }
        write!(f, "{}:", self.table)?;
        for field in &self.missing_columns {
            write!(f, "\n  missing column {}", field.name)?;
        }
        for index in &self.missing_indexes {
            write!(f, "\n  missing index {}", index.name)?;
        }
        for drift in &self.missing_constraints {
            write!(f, "\n  {drift}")?;
        }
        Ok(())
    }
}

/// Lists what the live table lacks. Extra live columns, indexes and
/// constraints are ignored.
#[must_use]
pub fn detect_drift(table: &TableMetadata, live: &LiveSchema) -> DriftReport {
    let missing_columns = table
        .fields()
        .iter()
        .filter(|f| live.column(&f.name).is_none())
        .cloned()
        .collect();

    let mut missing_indexes = Vec::new();
    let single = table
        .fields()
        .iter()
        .filter(|f| f.indexed)
        .map(|f| (None, vec![f.name.clone()]));
    let compound = table
        .indexes()
        .iter()
        .map(|i| (i.name.clone(), i.columns.clone()));
    for (name, columns) in single.chain(compound) {
        let name = name.unwrap_or_else(|| index_name(table.name(), &columns));
        if !live.has_index(&name, &columns) {
            missing_indexes.push(MissingIndex { name, columns });
        }
    }

    let mut missing_constraints = Vec::new();
    let unique_fields = table
        .fields()
        .iter()
        .filter(|f| f.unique && !table.is_single_primary_key(&f.name))
        .map(|f| vec![f.name.clone()]);
    for columns in unique_fields.chain(table.unique_constraints().iter().cloned()) {
        if !live.has_unique(&columns) {
            missing_constraints.push(Drift::MissingUnique { columns });
        }
    }
    let single_fks = table
        .references()
        .map(|(f, r)| (vec![f.name.clone()], &r.table, vec![r.field.clone()], r.on_delete));
    let compound_fks = table.foreign_keys().iter().map(|fk| {
        (
            fk.columns.clone(),
            &fk.references_table,
            fk.references_columns.clone(),
            fk.on_delete,
        )
    });
    for (columns, references_table, references_columns, on_delete) in single_fks.chain(compound_fks)
    {
        if !live.has_foreign_key(&columns, references_table) {
            missing_constraints.push(Drift::MissingForeignKey {
                columns,
                references_table: references_table.clone(),
                references_columns,
                on_delete,
            });
        }
    }

    DriftReport {
        table: String::from(table.name()),
        missing_columns,
        missing_indexes,
        missing_constraints,
    }
}
