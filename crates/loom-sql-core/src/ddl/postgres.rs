//! PostgreSQL DDL.

use super::DdlDialect;
use crate::dialect::Dialect;
use crate::schema::FieldType;

/// PostgreSQL DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDdl;

impl DdlDialect for PostgresDdl {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn map_type(&self, field_type: &FieldType, max_length: Option<u32>) -> String {
        match field_type {
            FieldType::Text => match max_length {
                Some(n) => format!("VARCHAR({n})"),
                None => String::from("TEXT"),
            },
            FieldType::Integer => String::from("INTEGER"),
            FieldType::Real => String::from("DOUBLE PRECISION"),
            FieldType::Boolean => String::from("BOOLEAN"),
            FieldType::Datetime => String::from("TIMESTAMPTZ"),
            FieldType::Json => String::from("JSONB"),
            FieldType::Custom(name) => name.clone(),
        }
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "GENERATED ALWAYS AS IDENTITY"
    }
}
