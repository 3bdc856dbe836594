//! SQLite DDL.

use super::{DdlDialect, default_literal};
use crate::dialect::Dialect;
use crate::schema::{DefaultValue, FieldType};

/// SQLite DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDdl;

impl DdlDialect for SqliteDdl {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn map_type(&self, field_type: &FieldType, _max_length: Option<u32>) -> String {
        // SQLite has dynamic typing with type affinity
        match field_type {
            FieldType::Integer | FieldType::Boolean => String::from("INTEGER"),
            FieldType::Real => String::from("REAL"),
            FieldType::Text | FieldType::Datetime | FieldType::Json => String::from("TEXT"),
            FieldType::Custom(name) => name.clone(),
        }
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "PRIMARY KEY AUTOINCREMENT"
    }

    fn inline_primary_key(&self) -> bool {
        true
    }

    fn render_default(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Bool(true) => String::from("1"),
            DefaultValue::Bool(false) => String::from("0"),
            other => default_literal(other, Dialect::Sqlite),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{DdlOptions, generate_ddl};
    use crate::schema::{TableBuilder, boolean, custom, integer, json, text};

    #[test]
    fn test_sqlite_types() {
        let ddl = SqliteDdl;
        assert_eq!(ddl.map_type(&FieldType::Text, Some(10)), "TEXT");
        assert_eq!(ddl.map_type(&FieldType::Boolean, None), "INTEGER");
        assert_eq!(ddl.map_type(&FieldType::Datetime, None), "TEXT");
        assert_eq!(ddl.map_type(&FieldType::Json, None), "TEXT");
        assert_eq!(ddl.field_type(&custom("id", "UUID"), false), "UUID");
        assert_eq!(ddl.field_type(&text("n").sql_type("VARCHAR(9)"), true), "VARCHAR(9)");
    }

    #[test]
    fn test_create_table_sql() {
        let table = TableBuilder::new("users")
            .field(text("id").primary())
            .field(text("email").unique())
            .field(boolean("active").default(DefaultValue::Bool(true)))
            .field(json("settings").optional())
            .build()
            .unwrap();
        let sql = generate_ddl(&table, Dialect::Sqlite)
            .render_ddl(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"users\" (\n  \
             \"id\" TEXT PRIMARY KEY NOT NULL,\n  \
             \"email\" TEXT NOT NULL UNIQUE,\n  \
             \"active\" INTEGER DEFAULT 1,\n  \
             \"settings\" TEXT\n)"
        );
    }

    #[test]
    fn test_autoincrement_and_compound_key() {
        let counters = TableBuilder::new("counters")
            .field(integer("id").primary().auto_increment())
            .build()
            .unwrap();
        let sql = SqliteDdl
            .create_table(&counters, DdlOptions { if_not_exists: false })
            .render_ddl(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"counters\" (\n  \"id\" INTEGER PRIMARY KEY AUTOINCREMENT\n)"
        );

        let members = TableBuilder::new("members")
            .field(integer("teamId"))
            .field(integer("userId"))
            .primary_key(["teamId", "userId"])
            .build()
            .unwrap();
        let sql = generate_ddl(&members, Dialect::Sqlite)
            .render_ddl(Dialect::Sqlite)
            .unwrap();
        assert!(sql.contains(r#"PRIMARY KEY ("teamId", "userId")"#));
    }
}
