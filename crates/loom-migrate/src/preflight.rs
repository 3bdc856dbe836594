//! Read-only queries run before adding a constraint to a populated table.
//!
//! Each query returns a single count; zero means the constraint can be
//! added. The templates hold identifiers only, so the exact text can be
//! reported back to the caller for manual diagnosis.

use loom_sql_core::Template;

use crate::drift::Drift;

/// Counts duplicate groups among rows where every column is non-null.
#[must_use]
pub fn unique_preflight(table: &str, columns: &[String]) -> Template {
    Template::raw("SELECT COUNT(*) FROM (SELECT ")
        .append(column_list(columns))
        .sql(" FROM ")
        .ident(table)
        .sql(" WHERE ")
        .append(not_null(None, columns))
        .sql(" GROUP BY ")
        .append(column_list(columns))
        .sql(" HAVING COUNT(*) > 1) AS ")
        .ident("dups")
}

/// Counts rows whose non-null key has no match in the referenced table.
#[must_use]
pub fn foreign_key_preflight(
    table: &str,
    columns: &[String],
    references_table: &str,
    references_columns: &[String],
) -> Template {
    let matches = Template::join(
        references_columns.iter().zip(columns).map(|(parent, child)| {
            Template::new()
                .qualified("parent", parent)
                .sql(" = ")
                .qualified("child", child)
        }),
        " AND ",
    );
    Template::raw("SELECT COUNT(*) FROM ")
        .ident(table)
        .sql(" AS ")
        .ident("child")
        .sql(" WHERE ")
        .append(not_null(Some("child"), columns))
        .sql(" AND NOT EXISTS (SELECT 1 FROM ")
        .ident(references_table)
        .sql(" AS ")
        .ident("parent")
        .sql(" WHERE ")
        .append(matches)
        .sql(")")
}

/// Returns the preflight query for a missing constraint.
#[must_use]
pub fn preflight_for(table: &str, drift: &Drift) -> Template {
    match drift {
        Drift::MissingUnique { columns } => unique_preflight(table, columns),
        Drift::MissingForeignKey {
            columns,
            references_table,
            references_columns,
            ..
        } => foreign_key_preflight(table, columns, references_table, references_columns),
    }
}

fn column_list(columns: &[String]) -> Template {
    Template::join(columns.iter().map(|c| Template::new().ident(c)), ", ")
}

fn not_null(alias: Option<&str>, columns: &[String]) -> Template {
    Template::join(
        columns.iter().map(|c| {
            let column = match alias {
                Some(alias) => Template::new().qualified(alias, c),
                None => Template::new().ident(c),
            };
            column.sql(" IS NOT NULL")
        }),
        " AND ",
    )
}
