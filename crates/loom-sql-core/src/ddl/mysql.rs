//! MySQL DDL.

use super::DdlDialect;
use crate::dialect::Dialect;
use crate::schema::FieldType;

/// MySQL DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDdl;

impl DdlDialect for MysqlDdl {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn map_type(&self, field_type: &FieldType, max_length: Option<u32>) -> String {
        match field_type {
            FieldType::Text => match max_length {
                Some(n) => format!("VARCHAR({n})"),
                None => String::from("TEXT"),
            },
            FieldType::Integer => String::from("INTEGER"),
            FieldType::Real => String::from("DOUBLE"),
            FieldType::Boolean => String::from("BOOLEAN"),
            FieldType::Datetime => String::from("DATETIME"),
            FieldType::Json => String::from("JSON"),
            FieldType::Custom(name) => name.clone(),
        }
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    // MySQL refuses keys on TEXT/BLOB columns without a prefix length.
    fn key_text_type(&self) -> Option<&'static str> {
        Some("VARCHAR(255)")
    }
}
