//! Additive schema synchronization.
//!
//! [`SchemaSync::ensure_table`] creates an absent table, or adds the
//! columns and indexes it lacks. Missing constraints are never added
//! implicitly: they fail with [`MigrateError::SchemaDrift`] until
//! [`SchemaSync::ensure_constraints`] is run, which first checks that the
//! existing rows satisfy each constraint.

use loom_sql_core::ddl::{
    DdlOptions, add_column_ddl, ddl_dialect, foreign_key_name, generate_ddl_statements,
    unique_index_ddl, unique_index_name,
};
use loom_sql_core::schema::TableMetadata;
use loom_sql_core::{CoreError, Dialect, SqlValue, Template};
use tracing::{debug, info, warn};

use crate::drift::{Drift, DriftReport, detect_drift};
use crate::driver::Driver;
use crate::error::{EnsureStep, MigrateError, Result};
use crate::introspect::{LiveSchema, inspect};
use crate::preflight::preflight_for;

/// Changes applied by one ensure call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnsureReport {
    /// Table name.
    pub table: String,
    /// Whether the table was created.
    pub created: bool,
    /// Columns added.
    pub added_columns: Vec<String>,
    /// Indexes created.
    pub created_indexes: Vec<String>,
    /// Constraints added, by name.
    pub added_constraints: Vec<String>,
}

impl EnsureReport {
    fn new(table: &str) -> Self {
        Self {
            table: String::from(table),
            ..Self::default()
        }
    }

    /// Returns `true` when nothing was changed.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        !self.created
            && self.added_columns.is_empty()
            && self.created_indexes.is_empty()
            && self.added_constraints.is_empty()
    }
}

/// Keeps live tables in line with their metadata.
///
/// Calls for one table run their statements sequentially. Two concurrent
/// ensures of the same table must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct SchemaSync<D: Driver> {
    driver: D,
}

impl<D: Driver> SchemaSync<D> {
    /// Creates a synchronizer over a driver.
    pub const fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Returns the driver.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Reports what the live table lacks. `None` when the table does not
    /// exist. Never writes.
    pub async fn inspect(&self, table: &TableMetadata) -> Result<Option<DriftReport>> {
        let live = inspect(&self.driver, table.name()).await?;
        Ok(live.exists().then(|| detect_drift(table, &live)))
    }

    /// Creates the table, or adds its missing columns and indexes.
    ///
    /// Fails with [`MigrateError::SchemaDrift`] when a declared unique or
    /// foreign key constraint is missing live. Changes made before that
    /// point stay applied and travel in the error.
    pub async fn ensure_table(&self, table: &TableMetadata) -> Result<EnsureReport> {
        let mut report = EnsureReport::new(table.name());
        let Some(drift) = self.ensure_structure(table, &mut report).await? else {
            return Ok(report);
        };

        if let Some(missing) = drift.missing_constraints.into_iter().next() {
            let remediation = self.remediation(table.name(), &missing);
            if !report.is_unchanged() {
                info!(
                    table = %table.name(),
                    columns = ?report.added_columns,
                    indexes = ?report.created_indexes,
                    "Applied before drift"
                );
            }
            warn!(
                table = %table.name(),
                drift = %missing,
                "Schema drift detected"
            );
            return Err(MigrateError::SchemaDrift {
                table: String::from(table.name()),
                drift: missing,
                remediation,
                applied: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Like [`Self::ensure_table`], then adds each missing constraint once
    /// its preflight query finds no violating rows.
    pub async fn ensure_constraints(&self, table: &TableMetadata) -> Result<EnsureReport> {
        let mut report = EnsureReport::new(table.name());
        let Some(drift) = self.ensure_structure(table, &mut report).await? else {
            return Ok(report);
        };

        for missing in drift.missing_constraints {
            self.preflight(table.name(), &missing).await?;
            let name = self.add_constraint(table.name(), &missing).await?;
            report.added_constraints.push(name);
        }
        Ok(report)
    }

    /// Steps 1 to 4. Returns the drift left after adding columns and
    /// indexes, or `None` when the table was just created.
    async fn ensure_structure(
        &self,
        table: &TableMetadata,
        report: &mut EnsureReport,
    ) -> Result<Option<DriftReport>> {
        let name = table.name();
        let live = self.introspect(name).await?;

        if !live.exists() {
            let statements = generate_ddl_statements(table, self.dialect(), DdlOptions::default());
            self.driver
                .transaction(&statements)
                .await
                .map_err(|e| e.at_step(name, EnsureStep::CreateTable))?;
            info!(table = %name, statements = statements.len(), "Created table");
            report.created = true;
            return Ok(None);
        }

        let mut drift = detect_drift(table, &live);
        debug!(table = %name, drift = %drift, "Compared live schema");

        for field in std::mem::take(&mut drift.missing_columns) {
            let statement = add_column_ddl(name, &field, self.dialect());
            self.driver
                .execute(&statement)
                .await
                .map_err(|e| e.at_step(name, EnsureStep::AddColumn))?;
            info!(table = %name, column = %field.name, "Added column");
            report.added_columns.push(field.name);
        }

        for index in std::mem::take(&mut drift.missing_indexes) {
            let statement = ddl_dialect(self.dialect()).create_index(
                name,
                &index.name,
                &index.columns,
                false,
                DdlOptions::default(),
            );
            self.driver
                .execute(&statement)
                .await
                .map_err(|e| e.at_step(name, EnsureStep::CreateIndex))?;
            info!(table = %name, index = %index.name, "Created index");
            report.created_indexes.push(index.name);
        }

        Ok(Some(drift))
    }

    async fn introspect(&self, table: &str) -> Result<LiveSchema> {
        inspect(&self.driver, table)
            .await
            .map_err(|e| e.at_step(table, EnsureStep::Introspect))
    }

    /// Step 5: fails when existing rows would violate the constraint.
    async fn preflight(&self, table: &str, missing: &Drift) -> Result<()> {
        let query = preflight_for(table, missing);
        let text = query
            .render_ddl(self.dialect())
            .map_err(|e| MigrateError::from(e).at_step(table, EnsureStep::Preflight))?;
        let count = self
            .driver
            .fetch_scalar(&query)
            .await
            .map_err(|e| e.at_step(table, EnsureStep::Preflight))?;
        let violations = violation_count(count.as_ref()).ok_or_else(|| {
            MigrateError::from(CoreError::Query(format!(
                "preflight returned non-integer count {count:?} for `{text}`"
            )))
            .at_step(table, EnsureStep::Preflight)
        })?;

        if violations > 0 {
            warn!(
                table = %table,
                constraint = %missing,
                violations,
                "Constraint preflight failed"
            );
            return Err(MigrateError::ConstraintPreflight {
                table: String::from(table),
                constraint: missing.to_string(),
                violations,
                query: text,
            });
        }
        debug!(table = %table, constraint = %missing, "Constraint preflight passed");
        Ok(())
    }

    /// Step 6: adds the constraint and returns its name.
    async fn add_constraint(&self, table: &str, missing: &Drift) -> Result<String> {
        let dialect = self.dialect();
        let (name, statement) = match missing {
            Drift::MissingUnique { columns } => (
                unique_index_name(table, columns),
                unique_index_ddl(table, columns, dialect),
            ),
            Drift::MissingForeignKey {
                columns,
                references_table,
                references_columns,
                on_delete,
            } => {
                if !dialect.supports_add_constraint() {
                    return Err(MigrateError::Unsupported {
                        dialect,
                        operation: format!("adding a foreign key to existing table '{table}'"),
                        hint: rebuild_hint(table, missing),
                    });
                }
                let clause = ddl_dialect(dialect).foreign_key_clause(
                    table,
                    columns,
                    references_table,
                    references_columns,
                    *on_delete,
                );
                (
                    foreign_key_name(table, columns),
                    Template::raw("ALTER TABLE ").ident(table).sql(" ADD ").append(clause),
                )
            }
        };

        self.driver
            .execute(&statement)
            .await
            .map_err(|e| e.at_step(table, EnsureStep::AddConstraint))?;
        info!(table = %table, constraint = %name, "Added constraint");
        Ok(name)
    }

    fn remediation(&self, table: &str, missing: &Drift) -> String {
        match missing {
            Drift::MissingForeignKey { .. } if !self.dialect().supports_add_constraint() => {
                rebuild_hint(table, missing)
            }
            _ => format!("Run ensure_constraints for '{table}' to add it after a preflight check."),
        }
    }
}

/// Reads a preflight count. Drivers may report `COUNT(*)` as an integer,
/// a whole float or numeric text; anything else is rejected.
fn violation_count(value: Option<&SqlValue>) -> Option<i64> {
    match value? {
        SqlValue::Int(n) => Some(*n),
        #[allow(clippy::cast_possible_truncation)]
        SqlValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        SqlValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn rebuild_hint(table: &str, missing: &Drift) -> String {
    format!(
        "rebuild '{table}' by hand: create a copy declaring the foreign key on ({}), copy the rows over, drop the old table and rename the copy",
        missing.columns().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_unchanged() {
        let mut report = EnsureReport::new("users");
        assert!(report.is_unchanged());
        report.created_indexes.push(String::from("idx_users_email"));
        assert!(!report.is_unchanged());
    }

    #[test]
    fn test_violation_count() {
        assert_eq!(violation_count(Some(&SqlValue::Int(2))), Some(2));
        assert_eq!(violation_count(Some(&SqlValue::Float(3.0))), Some(3));
        assert_eq!(
            violation_count(Some(&SqlValue::Text(String::from("4")))),
            Some(4)
        );
        assert_eq!(violation_count(Some(&SqlValue::Float(1.5))), None);
        assert_eq!(
            violation_count(Some(&SqlValue::Text(String::from("many")))),
            None
        );
        assert_eq!(violation_count(Some(&SqlValue::Null)), None);
        assert_eq!(violation_count(None), None);
    }

    #[test]
    fn test_rebuild_hint_names_columns() {
        let drift = Drift::MissingForeignKey {
            columns: vec![String::from("authorId")],
            references_table: String::from("users"),
            references_columns: vec![String::from("id")],
            on_delete: None,
        };
        let hint = rebuild_hint("posts", &drift);
        assert!(hint.contains("'posts'"));
        assert!(hint.contains("authorId"));
    }
}
