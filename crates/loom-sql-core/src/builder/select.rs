//! SELECT generation over table metadata.

use crate::dialect::Dialect;
use crate::render::Rendered;
use crate::schema::TableMetadata;
use crate::template::Template;

/// Builds the column list for the given tables.
///
/// Stored fields become `"table"."field" AS "table.field"`, derived fields
/// `(<expression>) AS "table.field"`.
#[must_use]
pub fn select_columns<'a>(tables: impl IntoIterator<Item = &'a TableMetadata>) -> Template {
    let mut columns = Vec::new();
    for table in tables {
        for field in table.fields() {
            columns.push(
                Template::new()
                    .qualified(table.name(), &field.name)
                    .sql(" AS ")
                    .ident(column_alias(table.name(), &field.name)),
            );
        }
        for derived in table.derived() {
            columns.push(
                Template::raw("(")
                    .append(derived.expression.clone())
                    .sql(") AS ")
                    .ident(column_alias(table.name(), &derived.name)),
            );
        }
    }
    Template::join(columns, ", ")
}

/// Renders the column list for the given tables.
#[must_use]
pub fn build_select_columns<'a>(
    tables: impl IntoIterator<Item = &'a TableMetadata>,
    dialect: Dialect,
) -> Rendered {
    select_columns(tables).render(dialect)
}

/// Renders a caller-built template as-is.
#[must_use]
pub fn raw_query(template: &Template, dialect: Dialect) -> Rendered {
    template.render(dialect)
}

/// The `"table.field"` alias used in result rows.
#[must_use]
pub fn column_alias(table: &str, field: &str) -> String {
    format!("{table}.{field}")
}

/// A SELECT over one main table plus joined tables.
///
/// ```rust
/// use loom_sql_core::{Dialect, Template};
/// use loom_sql_core::builder::EntitySelect;
/// use loom_sql_core::schema::{ForeignKeyRef, TableBuilder, text};
///
/// let users = TableBuilder::new("users")
///     .field(text("id").primary())
///     .build()
///     .unwrap();
/// let posts = TableBuilder::new("posts")
///     .field(text("id").primary())
///     .field(text("authorId").references(ForeignKeyRef::new("users", "id", "author")))
///     .build()
///     .unwrap();
///
/// let query = EntitySelect::new(&posts)
///     .table(&users)
///     .clause(
///         Template::raw("JOIN ")
///             .ident("users")
///             .sql(" ON ")
///             .qualified("users", "id")
///             .sql(" = ")
///             .qualified("posts", "authorId")
///             .sql(" WHERE ")
///             .qualified("users", "id")
///             .sql(" = ")
///             .param("u1"),
///     )
///     .build(Dialect::Postgres);
///
/// assert!(query.sql.starts_with(r#"SELECT "posts"."id" AS "posts.id""#));
/// assert!(query.sql.ends_with(r#"WHERE "users"."id" = $1"#));
/// ```
#[derive(Debug, Clone)]
pub struct EntitySelect<'a> {
    tables: Vec<&'a TableMetadata>,
    clause: Template,
}

impl<'a> EntitySelect<'a> {
    /// Starts a SELECT from the main table.
    #[must_use]
    pub fn new(main: &'a TableMetadata) -> Self {
        Self {
            tables: vec![main],
            clause: Template::new(),
        }
    }

    /// Adds a table whose columns are selected too.
    #[must_use]
    pub fn table(mut self, table: &'a TableMetadata) -> Self {
        self.tables.push(table);
        self
    }

    /// Appends to the trailing clause (JOIN, WHERE, ORDER BY ...).
    #[must_use]
    pub fn clause(mut self, clause: impl Into<Template>) -> Self {
        let clause = clause.into();
        if !self.clause.is_empty() && !clause.is_empty() {
            self.clause = self.clause.sql(" ");
        }
        self.clause = self.clause.append(clause);
        self
    }

    /// Returns the selected tables, main table first.
    #[must_use]
    pub fn tables(&self) -> &[&'a TableMetadata] {
        &self.tables
    }

    /// Builds the statement template.
    #[must_use]
    pub fn to_template(&self) -> Template {
        let mut sql = Template::raw("SELECT ")
            .append(select_columns(self.tables.iter().copied()))
            .sql(" FROM ")
            .ident(self.tables[0].name());
        if !self.clause.is_empty() {
            sql = sql.sql(" ").append(self.clause.clone());
        }
        sql
    }

    /// Renders the statement.
    #[must_use]
    pub fn build(&self, dialect: Dialect) -> Rendered {
        self.to_template().render(dialect)
    }
}
