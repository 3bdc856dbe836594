//! SQLite driver over an sqlx pool.

use loom_sql_core::{Dialect, Rendered, Row, SqlValue, Template};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use super::Driver;
use crate::error::{MigrateError, Result, ViolationKind};
use crate::introspect::{Constraint, ConstraintKind, LiveColumn, LiveIndex};

/// [`Driver`] for SQLite.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to a database URL such as `sqlite:db.sqlite3`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Index list of a table with each index's origin
    /// (`c` created, `u` unique constraint, `pk` primary key).
    async fn index_list(&self, table: &str) -> Result<Vec<(LiveIndex, String)>> {
        let list = Template::raw(r#"SELECT name, "unique", origin FROM pragma_index_list("#)
            .param(table)
            .sql(") ORDER BY seq");
        let mut indexes = Vec::new();
        for row in self.fetch_rows(&list).await? {
            let name = text_at(&row, "name").unwrap_or_default();
            let info = Template::raw("SELECT name FROM pragma_index_info(")
                .param(name.as_str())
                .sql(") ORDER BY seqno");
            let columns = self
                .fetch_rows(&info)
                .await?
                .iter()
                .filter_map(|r| text_at(r, "name"))
                .collect();
            let index = LiveIndex {
                name,
                columns,
                unique: int_at(&row, "unique") != 0,
            };
            indexes.push((index, text_at(&row, "origin").unwrap_or_default()));
        }
        Ok(indexes)
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_rows(&self, query: &Template) -> Result<Vec<Row>> {
        let rendered = query.render(Dialect::Sqlite);
        debug!(sql = %rendered.sql, params = rendered.params.len(), "Fetching rows");
        let rows = bind_all(&rendered)
            .fetch_all(&self.pool)
            .await
            .map_err(translate_error)?;
        rows.iter()
            .map(|row| convert_row(row).map_err(MigrateError::from))
            .collect()
    }

    async fn execute(&self, statement: &Template) -> Result<u64> {
        let rendered = statement.render(Dialect::Sqlite);
        debug!(sql = %rendered.sql, params = rendered.params.len(), "Executing SQL");
        let done = bind_all(&rendered)
            .execute(&self.pool)
            .await
            .map_err(translate_error)?;
        Ok(done.rows_affected())
    }

    async fn fetch_scalar(&self, query: &Template) -> Result<Option<SqlValue>> {
        let rendered = query.render(Dialect::Sqlite);
        debug!(sql = %rendered.sql, params = rendered.params.len(), "Fetching scalar");
        let row = bind_all(&rendered)
            .fetch_optional(&self.pool)
            .await
            .map_err(translate_error)?;
        match row {
            Some(row) if !row.columns().is_empty() => Ok(Some(column_value(&row, 0)?)),
            _ => Ok(None),
        }
    }

    async fn transaction(&self, statements: &[Template]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for statement in statements {
            let rendered = statement.render(Dialect::Sqlite);
            debug!(sql = %rendered.sql, "Executing SQL in transaction");
            let done = bind_all(&rendered)
                .execute(&mut *tx)
                .await
                .map_err(translate_error)?;
            affected += done.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let query = Template::raw(
            r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info("#,
        )
        .param(table)
        .sql(") ORDER BY cid");
        let rows = self.fetch_rows(&query).await?;
        Ok(rows
            .iter()
            .map(|row| LiveColumn {
                name: text_at(row, "name").unwrap_or_default(),
                sql_type: text_at(row, "type").unwrap_or_default(),
                nullable: int_at(row, "notnull") == 0,
                primary_key: int_at(row, "pk") > 0,
                default: text_at(row, "dflt_value"),
            })
            .collect())
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<LiveIndex>> {
        Ok(self
            .index_list(table)
            .await?
            .into_iter()
            .map(|(index, _)| index)
            .collect())
    }

    async fn list_constraints(&self, table: &str) -> Result<Vec<Constraint>> {
        let mut constraints = Vec::new();

        let pk = Template::raw("SELECT name FROM pragma_table_info(")
            .param(table)
            .sql(") WHERE pk > 0 ORDER BY pk");
        let pk_columns: Vec<String> = self
            .fetch_rows(&pk)
            .await?
            .iter()
            .filter_map(|row| text_at(row, "name"))
            .collect();
        if !pk_columns.is_empty() {
            constraints.push(Constraint::new(ConstraintKind::PrimaryKey, None, pk_columns));
        }

        // Unique constraints and unique indexes are enforced the same way.
        for (index, origin) in self.index_list(table).await? {
            if index.unique && origin != "pk" {
                constraints.push(Constraint::new(
                    ConstraintKind::Unique,
                    Some(index.name),
                    index.columns,
                ));
            }
        }

        let fks = Template::raw(
            r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list("#,
        )
        .param(table)
        .sql(") ORDER BY id, seq");
        // One row per column; compound keys share an id.
        let mut foreign_keys: Vec<(i64, Constraint)> = Vec::new();
        for row in self.fetch_rows(&fks).await? {
            let id = int_at(&row, "id");
            let from = text_at(&row, "from").unwrap_or_default();
            let to = text_at(&row, "to");
            match foreign_keys.last_mut() {
                Some((last, fk)) if *last == id => {
                    fk.columns.push(from);
                    fk.references_columns.extend(to);
                }
                _ => {
                    let references = text_at(&row, "table").unwrap_or_default();
                    foreign_keys.push((
                        id,
                        Constraint::foreign_key(None, vec![from], references, to.into_iter().collect()),
                    ));
                }
            }
        }
        constraints.extend(foreign_keys.into_iter().map(|(_, fk)| fk));

        Ok(constraints)
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Blob(b) => query.bind(b.clone()),
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}

fn bind_all(rendered: &Rendered) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    rendered
        .params
        .iter()
        .fold(sqlx::query(&rendered.sql), bind_value)
}

fn column_value(row: &SqliteRow, index: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
        "REAL" => SqlValue::Float(row.try_get(index)?),
        "BLOB" => SqlValue::Blob(row.try_get(index)?),
        _ => SqlValue::Text(row.try_get(index)?),
    };
    Ok(value)
}

fn convert_row(row: &SqliteRow) -> std::result::Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        out.insert(
            String::from(column.name()),
            column_value(row, column.ordinal())?,
        );
    }
    Ok(out)
}

fn text_at(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(SqlValue::as_str).map(String::from)
}

fn int_at(row: &Row, column: &str) -> i64 {
    row.get(column).and_then(SqlValue::as_i64).unwrap_or(0)
}

/// Turns constraint failures into [`MigrateError::ConstraintViolation`];
/// everything else stays a database error.
fn translate_error(err: sqlx::Error) -> MigrateError {
    let violation = match &err {
        sqlx::Error::Database(db) => violation_kind(db.kind()).map(|kind| {
            let message = String::from(db.message());
            let (table, column) = failed_column(&message);
            MigrateError::ConstraintViolation {
                kind,
                table,
                column,
                constraint: db.constraint().map(String::from),
                message,
            }
        }),
        _ => None,
    };
    violation.unwrap_or(MigrateError::Database(err))
}

fn violation_kind(kind: sqlx::error::ErrorKind) -> Option<ViolationKind> {
    use sqlx::error::ErrorKind;
    match kind {
        ErrorKind::UniqueViolation => Some(ViolationKind::Unique),
        ErrorKind::ForeignKeyViolation => Some(ViolationKind::ForeignKey),
        ErrorKind::NotNullViolation => Some(ViolationKind::NotNull),
        ErrorKind::CheckViolation => Some(ViolationKind::Check),
        _ => None,
    }
}

/// Parses `"UNIQUE constraint failed: users.email"` into table and column.
/// Compound failures report their first column.
fn failed_column(message: &str) -> (Option<String>, Option<String>) {
    let Some((_, target)) = message.split_once("constraint failed: ") else {
        return (None, None);
    };
    let first = target.split(',').next().unwrap_or_default().trim();
    match first.split_once('.') {
        Some((table, column)) => (Some(String::from(table)), Some(String::from(column))),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn driver() -> SqliteDriver {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        SqliteDriver::new(pool)
    }

    async fn setup(driver: &SqliteDriver) {
        driver
            .transaction(&[
                Template::raw(
                    r#"CREATE TABLE "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "email" TEXT NOT NULL UNIQUE, "score" REAL, "avatar" BLOB)"#,
                ),
                Template::raw(
                    r#"CREATE TABLE "posts" ("id" TEXT PRIMARY KEY, "authorId" INTEGER NOT NULL, CONSTRAINT "fk_posts_authorId" FOREIGN KEY ("authorId") REFERENCES "users" ("id"))"#,
                ),
                Template::raw(r#"CREATE INDEX "idx_posts_authorId" ON "posts" ("authorId")"#),
            ])
            .await
            .unwrap();
    }

    #[test]
    fn test_failed_column() {
        assert_eq!(
            failed_column("UNIQUE constraint failed: users.email"),
            (Some(String::from("users")), Some(String::from("email")))
        );
        assert_eq!(
            failed_column("UNIQUE constraint failed: m.a, m.b"),
            (Some(String::from("m")), Some(String::from("a")))
        );
        assert_eq!(failed_column("FOREIGN KEY constraint failed"), (None, None));
    }

    #[tokio::test]
    async fn test_params_and_row_conversion() {
        let driver = driver().await;
        setup(&driver).await;

        let insert = Template::raw(r#"INSERT INTO "users" ("email", "score", "avatar") VALUES ("#)
            .param("a@example.com")
            .sql(", ")
            .param(1.5)
            .sql(", ")
            .param(SqlValue::Blob(vec![1, 2]))
            .sql(")");
        assert_eq!(driver.execute(&insert).await.unwrap(), 1);

        let select = Template::raw(r#"SELECT "id" AS "users.id", "email", "score", "avatar" FROM "users""#);
        let rows = driver.fetch_rows(&select).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("users.id"), Some(&SqlValue::Int(1)));
        assert_eq!(
            rows[0].get("email"),
            Some(&SqlValue::Text(String::from("a@example.com")))
        );
        assert_eq!(rows[0].get("score"), Some(&SqlValue::Float(1.5)));
        assert_eq!(rows[0].get("avatar"), Some(&SqlValue::Blob(vec![1, 2])));

        let count = driver
            .fetch_scalar(&Template::raw(r#"SELECT COUNT(*) FROM "users""#))
            .await
            .unwrap();
        assert_eq!(count, Some(SqlValue::Int(1)));
    }

    #[tokio::test]
    async fn test_unique_violation_is_translated() {
        let driver = driver().await;
        setup(&driver).await;
        let insert = Template::raw(r#"INSERT INTO "users" ("email") VALUES ("#)
            .param("dup@example.com")
            .sql(")");
        driver.execute(&insert).await.unwrap();

        let err = driver.execute(&insert).await.unwrap_err();
        match err {
            MigrateError::ConstraintViolation {
                kind,
                table,
                column,
                ..
            } => {
                assert_eq!(kind, ViolationKind::Unique);
                assert_eq!(table.as_deref(), Some("users"));
                assert_eq!(column.as_deref(), Some("email"));
            }
            other => panic!("expected a constraint violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transaction_rolls_back() {
        let driver = driver().await;
        let result = driver
            .transaction(&[
                Template::raw(r#"CREATE TABLE "t" ("id" INTEGER)"#),
                Template::raw("NOT VALID SQL"),
            ])
            .await;
        assert!(result.is_err());
        assert!(driver.list_columns("t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_introspection() {
        let driver = driver().await;
        setup(&driver).await;

        let columns = driver.list_columns("users").await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "email", "score", "avatar"]);
        assert!(columns[0].primary_key);
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);

        let constraints = driver.list_constraints("users").await.unwrap();
        assert!(constraints
            .iter()
            .any(|c| c.kind == ConstraintKind::Unique && c.columns == ["email"]));
        assert!(constraints
            .iter()
            .any(|c| c.kind == ConstraintKind::PrimaryKey && c.columns == ["id"]));

        let indexes = driver.list_indexes("posts").await.unwrap();
        assert!(indexes
            .iter()
            .any(|i| i.name == "idx_posts_authorId" && i.columns == ["authorId"] && !i.unique));

        let fks: Vec<Constraint> = driver
            .list_constraints("posts")
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.kind == ConstraintKind::ForeignKey)
            .collect();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, ["authorId"]);
        assert_eq!(fks[0].references_table.as_deref(), Some("users"));
        assert_eq!(fks[0].references_columns, ["id"]);

        assert!(driver.list_columns("missing").await.unwrap().is_empty());
    }
}
