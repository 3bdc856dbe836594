//! DDL generation from table metadata.
//!
//! Every statement is produced as a [`Template`] whose only values are
//! identifiers, so it renders through [`Template::render_ddl`]. Dialect
//! differences (type mapping, auto-increment, primary key placement) live in
//! the [`DdlDialect`] implementations.
//!
//! ```rust
//! use loom_sql_core::Dialect;
//! use loom_sql_core::ddl::generate_ddl;
//! use loom_sql_core::schema::{TableBuilder, integer, text};
//!
//! let users = TableBuilder::new("users")
//!     .field(integer("id").primary().auto_increment())
//!     .field(text("email").unique())
//!     .build()
//!     .unwrap();
//!
//! let sql = generate_ddl(&users, Dialect::Sqlite).render_ddl(Dialect::Sqlite).unwrap();
//! assert!(sql.contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#));
//! assert!(sql.contains(r#""email" TEXT NOT NULL UNIQUE"#));
//! ```

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MysqlDdl;
pub use postgres::PostgresDdl;
pub use sqlite::SqliteDdl;

use crate::dialect::Dialect;
use crate::schema::{
    DefaultValue, Field, FieldType, ForeignKeyRef, OnDelete, PrimaryKey, TableMetadata,
};
use crate::template::Template;
use crate::value::SqlValue;

/// Options for statement generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdlOptions {
    /// Emit `IF NOT EXISTS` where the dialect supports it.
    pub if_not_exists: bool,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            if_not_exists: true,
        }
    }
}

/// Where a column definition is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnUse {
    /// Inside `CREATE TABLE`.
    CreateTable,
    /// In `ALTER TABLE ... ADD COLUMN`. Key and unique markers are left
    /// out, since not every dialect can add them to a populated table.
    AddColumn,
}

/// Dialect-specific DDL generation.
pub trait DdlDialect {
    /// Returns the dialect.
    fn dialect(&self) -> Dialect;

    /// Maps a semantic field type to the dialect's SQL type.
    fn map_type(&self, field_type: &FieldType, max_length: Option<u32>) -> String;

    /// Returns the auto-increment keyword for a primary-key column.
    fn autoincrement_keyword(&self) -> &'static str;

    /// Whether a single-field primary key is written on the column.
    fn inline_primary_key(&self) -> bool {
        false
    }

    /// Type used for unbounded text that is part of a key or index, on
    /// dialects that cannot index `TEXT` without a prefix length.
    fn key_text_type(&self) -> Option<&'static str> {
        None
    }

    /// Returns the SQL type of a field, honouring an explicit override.
    /// `keyed` marks a column that a key or index covers.
    fn field_type(&self, field: &Field, keyed: bool) -> String {
        if let Some(sql_type) = &field.sql_type {
            return sql_type.clone();
        }
        match self.key_text_type() {
            Some(bounded)
                if keyed && field.field_type == FieldType::Text && field.max_length.is_none() =>
            {
                String::from(bounded)
            }
            _ => self.map_type(&field.field_type, field.max_length),
        }
    }

    /// Renders a default value.
    fn render_default(&self, default: &DefaultValue) -> String {
        default_literal(default, self.dialect())
    }

    /// Generates a column definition. `keyed` marks a column covered by a
    /// key or index.
    fn column_definition(&self, field: &Field, usage: ColumnUse, keyed: bool) -> Template {
        let create = usage == ColumnUse::CreateTable;
        let mut column = Template::new()
            .ident(&field.name)
            .sql(" ")
            .text(&self.field_type(field, keyed));

        if create && field.primary_key {
            if field.auto_increment {
                column = column.sql(" ").text(self.autoincrement_keyword());
            } else if self.inline_primary_key() {
                column = column.sql(" PRIMARY KEY");
            }
        }
        if field.is_required() {
            column = column.sql(" NOT NULL");
        }
        if let Some(default) = &field.default {
            if !field.auto_increment {
                column = column.sql(" DEFAULT ").text(&self.render_default(default));
            }
        }
        if create && field.unique && !field.primary_key {
            column = column.sql(" UNIQUE");
        }
        column
    }

    /// Generates the separate `PRIMARY KEY (...)` clause, if one is needed.
    fn primary_key_clause(&self, table: &TableMetadata) -> Option<Template> {
        match table.primary_key() {
            PrimaryKey::None => None,
            PrimaryKey::Field(_) if self.inline_primary_key() => None,
            pk => Some(
                Template::raw("PRIMARY KEY (")
                    .append(ident_list(pk.columns()))
                    .sql(")"),
            ),
        }
    }

    /// Generates a named `FOREIGN KEY` constraint clause.
    fn foreign_key_clause(
        &self,
        table: &str,
        columns: &[String],
        references_table: &str,
        references_columns: &[String],
        on_delete: Option<OnDelete>,
    ) -> Template {
        let mut clause = Template::raw("CONSTRAINT ")
            .ident(foreign_key_name(table, columns))
            .sql(" FOREIGN KEY (")
            .append(ident_list(columns))
            .sql(") REFERENCES ")
            .ident(references_table)
            .sql(" (")
            .append(ident_list(references_columns))
            .sql(")");
        if let Some(action) = on_delete {
            clause = clause.sql(" ON DELETE ").text(action.as_sql());
        }
        clause
    }

    /// Generates `CREATE TABLE`.
    fn create_table(&self, table: &TableMetadata, options: DdlOptions) -> Template {
        let mut items: Vec<Template> = table
            .fields()
            .iter()
            .map(|f| {
                self.column_definition(f, ColumnUse::CreateTable, table.is_key_column(&f.name))
            })
            .collect();

        items.extend(self.primary_key_clause(table));
        for (field, reference) in table.references() {
            items.push(self.foreign_key_clause(
                table.name(),
                std::slice::from_ref(&field.name),
                &reference.table,
                std::slice::from_ref(&reference.field),
                reference.on_delete,
            ));
        }
        for fk in table.foreign_keys() {
            items.push(self.foreign_key_clause(
                table.name(),
                &fk.columns,
                &fk.references_table,
                &fk.references_columns,
                fk.on_delete,
            ));
        }
        for columns in table.unique_constraints() {
            items.push(
                Template::raw("CONSTRAINT ")
                    .ident(unique_index_name(table.name(), columns))
                    .sql(" UNIQUE (")
                    .append(ident_list(columns))
                    .sql(")"),
            );
        }

        let mut sql = Template::raw("CREATE TABLE ");
        if options.if_not_exists {
            sql = sql.sql("IF NOT EXISTS ");
        }
        sql.ident(table.name())
            .sql(" (\n  ")
            .append(Template::join(items, ",\n  "))
            .sql("\n)")
    }

    /// Generates `CREATE [UNIQUE] INDEX`.
    fn create_index(
        &self,
        table: &str,
        name: &str,
        columns: &[String],
        unique: bool,
        options: DdlOptions,
    ) -> Template {
        let mut sql = if unique {
            Template::raw("CREATE UNIQUE INDEX ")
        } else {
            Template::raw("CREATE INDEX ")
        };
        if options.if_not_exists && self.dialect().supports_index_if_not_exists() {
            sql = sql.sql("IF NOT EXISTS ");
        }
        sql.ident(name)
            .sql(" ON ")
            .ident(table)
            .sql(" (")
            .append(ident_list(columns))
            .sql(")")
    }

    /// Generates `ALTER TABLE ... ADD COLUMN`.
    fn add_column(&self, table: &str, field: &Field, options: DdlOptions) -> Template {
        let mut sql = Template::raw("ALTER TABLE ").ident(table).sql(" ADD COLUMN ");
        if options.if_not_exists && self.dialect().supports_add_column_if_not_exists() {
            sql = sql.sql("IF NOT EXISTS ");
        }
        sql.append(self.column_definition(field, ColumnUse::AddColumn, field.is_key()))
    }

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    fn add_foreign_key(&self, table: &str, column: &str, reference: &ForeignKeyRef) -> Template {
        Template::raw("ALTER TABLE ").ident(table).sql(" ADD ").append(
            self.foreign_key_clause(
                table,
                &[String::from(column)],
                &reference.table,
                std::slice::from_ref(&reference.field),
                reference.on_delete,
            ),
        )
    }

    /// Generates every statement needed to create the table.
    fn table_statements(&self, table: &TableMetadata, options: DdlOptions) -> Vec<Template> {
        let mut statements = vec![self.create_table(table, options)];
        for field in table.fields().iter().filter(|f| f.indexed) {
            let columns = std::slice::from_ref(&field.name);
            statements.push(self.create_index(
                table.name(),
                &index_name(table.name(), columns),
                columns,
                false,
                options,
            ));
        }
        for index in table.indexes() {
            let name = index
                .name
                .clone()
                .unwrap_or_else(|| index_name(table.name(), &index.columns));
            statements.push(self.create_index(table.name(), &name, &index.columns, false, options));
        }
        statements
    }
}

static SQLITE: SqliteDdl = SqliteDdl;
static POSTGRES: PostgresDdl = PostgresDdl;
static MYSQL: MysqlDdl = MysqlDdl;

/// Returns the DDL generator for a dialect.
#[must_use]
pub fn ddl_dialect(dialect: Dialect) -> &'static dyn DdlDialect {
    match dialect {
        Dialect::Sqlite => &SQLITE,
        Dialect::Postgres => &POSTGRES,
        Dialect::Mysql => &MYSQL,
    }
}

/// Generates the full DDL for a table as one template, statements
/// separated by `;\n`.
#[must_use]
pub fn generate_ddl(table: &TableMetadata, dialect: Dialect) -> Template {
    Template::join(
        generate_ddl_statements(table, dialect, DdlOptions::default()),
        ";\n",
    )
}

/// Generates the DDL for a table as separate statements.
#[must_use]
pub fn generate_ddl_statements(
    table: &TableMetadata,
    dialect: Dialect,
    options: DdlOptions,
) -> Vec<Template> {
    ddl_dialect(dialect).table_statements(table, options)
}

/// Generates a standalone column fragment.
#[must_use]
pub fn column_ddl(field: &Field, dialect: Dialect) -> Template {
    ddl_dialect(dialect).column_definition(field, ColumnUse::AddColumn, field.is_key())
}

/// Generates `ALTER TABLE ... ADD COLUMN` for a missing column.
#[must_use]
pub fn add_column_ddl(table: &str, field: &Field, dialect: Dialect) -> Template {
    ddl_dialect(dialect).add_column(table, field, DdlOptions::default())
}

/// Generates `CREATE INDEX` with the generated `idx_` name.
#[must_use]
pub fn create_index_ddl(table: &str, columns: &[String], dialect: Dialect) -> Template {
    ddl_dialect(dialect).create_index(
        table,
        &index_name(table, columns),
        columns,
        false,
        DdlOptions::default(),
    )
}

/// Generates `CREATE UNIQUE INDEX` with the generated `uq_` name.
#[must_use]
pub fn unique_index_ddl(table: &str, columns: &[String], dialect: Dialect) -> Template {
    ddl_dialect(dialect).create_index(
        table,
        &unique_index_name(table, columns),
        columns,
        true,
        DdlOptions::default(),
    )
}

/// Generates `ALTER TABLE ... ADD CONSTRAINT` for a single-field foreign
/// key.
#[must_use]
pub fn add_foreign_key_ddl(
    table: &str,
    column: &str,
    reference: &ForeignKeyRef,
    dialect: Dialect,
) -> Template {
    ddl_dialect(dialect).add_foreign_key(table, column, reference)
}

/// Name of the plain index over `columns`.
#[must_use]
pub fn index_name(table: &str, columns: &[String]) -> String {
    format!("idx_{table}_{}", columns.join("_"))
}

/// Name of the unique index or constraint over `columns`.
#[must_use]
pub fn unique_index_name(table: &str, columns: &[String]) -> String {
    format!("uq_{table}_{}", columns.join("_"))
}

/// Name of the foreign key constraint over `columns`.
#[must_use]
pub fn foreign_key_name(table: &str, columns: &[String]) -> String {
    format!("fk_{table}_{}", columns.join("_"))
}

fn ident_list(columns: &[String]) -> Template {
    Template::join(columns.iter().map(|c| Template::new().ident(c)), ", ")
}

fn default_literal(default: &DefaultValue, dialect: Dialect) -> String {
    match default {
        DefaultValue::Builtin(b) => String::from(b.keyword(dialect)),
        DefaultValue::Expression(expr) => expr.clone(),
        DefaultValue::Null => String::from("NULL"),
        DefaultValue::Bool(b) => SqlValue::Bool(*b).to_sql_inline(),
        DefaultValue::Int(n) => n.to_string(),
        DefaultValue::Float(f) => f.to_string(),
        DefaultValue::Text(s) => SqlValue::Text(s.clone()).to_sql_inline(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlBuiltin;
    use crate::schema::{TableBuilder, datetime, text};

    fn posts() -> TableMetadata {
        TableBuilder::new("posts")
            .field(text("id").primary())
            .field(text("title").max_length(200))
            .field(text("authorId").indexed().references(
                ForeignKeyRef::new("users", "id", "author").on_delete(OnDelete::Cascade),
            ))
            .field(
                datetime("createdAt")
                    .default(DefaultValue::Builtin(SqlBuiltin::CurrentTimestamp)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_generated_ddl_has_no_params() {
        for dialect in Dialect::ALL {
            let ddl = generate_ddl(&posts(), dialect);
            assert_eq!(ddl.param_count(), 0);
            assert!(ddl.render_ddl(dialect).is_ok());
        }
    }

    #[test]
    fn test_statements_include_index() {
        let statements = generate_ddl_statements(&posts(), Dialect::Postgres, DdlOptions::default());
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1].render_ddl(Dialect::Postgres).unwrap(),
            r#"CREATE INDEX IF NOT EXISTS "idx_posts_authorId" ON "posts" ("authorId")"#
        );
    }

    #[test]
    fn test_foreign_key_clause() {
        let sql = generate_ddl(&posts(), Dialect::Sqlite)
            .render_ddl(Dialect::Sqlite)
            .unwrap();
        assert!(sql.contains(
            r#"CONSTRAINT "fk_posts_authorId" FOREIGN KEY ("authorId") REFERENCES "users" ("id") ON DELETE CASCADE"#
        ));
        assert!(sql.contains(r#""createdAt" TEXT DEFAULT CURRENT_TIMESTAMP"#));
    }

    #[test]
    fn test_add_column_omits_key_markers() {
        let field = text("email").unique();
        assert_eq!(
            add_column_ddl("users", &field, Dialect::Sqlite)
                .render_ddl(Dialect::Sqlite)
                .unwrap(),
            r#"ALTER TABLE "users" ADD COLUMN "email" TEXT NOT NULL"#
        );
        assert_eq!(
            add_column_ddl("users", &field, Dialect::Postgres)
                .render_ddl(Dialect::Postgres)
                .unwrap(),
            r#"ALTER TABLE "users" ADD COLUMN IF NOT EXISTS "email" TEXT NOT NULL"#
        );
    }

    #[test]
    fn test_index_names_are_distinct() {
        let cols = vec![String::from("email")];
        assert_eq!(index_name("users", &cols), "idx_users_email");
        assert_eq!(unique_index_name("users", &cols), "uq_users_email");
        assert_eq!(foreign_key_name("users", &cols), "fk_users_email");
        let plain = create_index_ddl("users", &cols, Dialect::Mysql)
            .render_ddl(Dialect::Mysql)
            .unwrap();
        assert_eq!(plain, "CREATE INDEX `idx_users_email` ON `users` (`email`)");
        let unique = unique_index_ddl("users", &cols, Dialect::Sqlite)
            .render_ddl(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            unique,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "uq_users_email" ON "users" ("email")"#
        );
    }

    #[test]
    fn test_add_foreign_key() {
        let reference = ForeignKeyRef::new("users", "id", "author");
        let sql = add_foreign_key_ddl("posts", "authorId", &reference, Dialect::Postgres)
            .render_ddl(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            sql,
            r#"ALTER TABLE "posts" ADD CONSTRAINT "fk_posts_authorId" FOREIGN KEY ("authorId") REFERENCES "users" ("id")"#
        );
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(
            default_literal(&DefaultValue::Text(String::from("it's")), Dialect::Postgres),
            "'it''s'"
        );
        assert_eq!(default_literal(&DefaultValue::Bool(true), Dialect::Postgres), "TRUE");
        assert_eq!(
            default_literal(&DefaultValue::Builtin(SqlBuiltin::RandomUuid), Dialect::Mysql),
            "UUID()"
        );
    }
}
