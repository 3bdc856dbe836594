#![allow(dead_code)]

use loom_migrate::{Driver, SchemaSync, SqliteDriver};
use loom_sql_core::schema::{
    ForeignKeyRef, OnDelete, TableBuilder, TableMetadata, boolean, integer, text,
};
use loom_sql_core::Template;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn sqlite() -> SqliteDriver {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap_or_else(|e| panic!("in-memory database: {e}"));
    SqliteDriver::new(pool)
}

pub async fn sync() -> SchemaSync<SqliteDriver> {
    SchemaSync::new(sqlite().await)
}

pub fn users() -> TableMetadata {
    TableBuilder::new("users")
        .field(integer("id").primary().auto_increment())
        .field(text("email").unique())
        .field(text("name").optional())
        .build()
        .unwrap_or_else(|e| panic!("invalid users table: {e}"))
}

pub fn posts() -> TableMetadata {
    TableBuilder::new("posts")
        .field(text("id").primary())
        .field(text("title"))
        .field(
            integer("authorId").indexed().references(
                ForeignKeyRef::new("users", "id", "author")
                    .reverse("posts")
                    .on_delete(OnDelete::Cascade),
            ),
        )
        .field(boolean("published").optional())
        .build()
        .unwrap_or_else(|e| panic!("invalid posts table: {e}"))
}

/// Runs hand-written SQL, for tables created outside the synchronizer.
pub async fn exec<D: Driver>(driver: &D, sql: &'static str) {
    driver
        .execute(&Template::raw(sql))
        .await
        .unwrap_or_else(|e| panic!("`{sql}` failed: {e}"));
}
