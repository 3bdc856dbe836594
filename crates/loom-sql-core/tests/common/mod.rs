#![allow(dead_code)]

use loom_sql_core::schema::{
    DefaultValue, ForeignKeyRef, OnDelete, TableBuilder, TableMetadata, boolean, datetime, integer,
    json, text,
};
use loom_sql_core::{Dialect, SqlBuiltin, Template};

pub fn users() -> TableMetadata {
    TableBuilder::new("users")
        .field(text("id").primary())
        .field(text("name"))
        .field(text("email").max_length(255).unique())
        .field(boolean("active").default(DefaultValue::Bool(true)))
        .field(json("settings").optional())
        .build()
        .unwrap_or_else(|e| panic!("invalid users table: {e}"))
}

pub fn posts() -> TableMetadata {
    TableBuilder::new("posts")
        .field(text("id").primary())
        .field(text("title"))
        .field(
            text("authorId").indexed().references(
                ForeignKeyRef::new("users", "id", "author")
                    .reverse("posts")
                    .on_delete(OnDelete::Cascade),
            ),
        )
        .field(integer("views").default(DefaultValue::Int(0)))
        .field(datetime("createdAt").default(DefaultValue::Builtin(SqlBuiltin::CurrentTimestamp)))
        .build()
        .unwrap_or_else(|e| panic!("invalid posts table: {e}"))
}

pub fn ddl(template: &Template, dialect: Dialect) -> String {
    template
        .render_ddl(dialect)
        .unwrap_or_else(|e| panic!("DDL rendering failed for {dialect}: {e}"))
}
