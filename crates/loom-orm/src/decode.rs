//! Decoding and structural validation of extracted sub-rows.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use loom_sql_core::schema::{FieldType, TableMetadata};
use loom_sql_core::SqlValue;

use crate::error::{FieldIssue, ValidationError};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Decodes a sub-row against its table, in field declaration order
/// (stored fields, then derived fields). Columns the table does not declare
/// are dropped.
pub fn decode_entity(
    table: &TableMetadata,
    key: &str,
    mut raw: BTreeMap<String, SqlValue>,
) -> Result<Vec<(String, SqlValue)>, ValidationError> {
    let mut fields = Vec::with_capacity(table.fields().len() + table.derived().len());
    let mut issues = Vec::new();

    let stored = table
        .fields()
        .iter()
        .map(|f| (&f.name, &f.field_type, f.max_length, f.nullable));
    let derived = table
        .derived()
        .iter()
        .map(|d| (&d.name, &d.field_type, None, true));

    for (name, field_type, max_length, nullable) in stored.chain(derived) {
        let value = raw.remove(name.as_str()).unwrap_or(SqlValue::Null);
        if value.is_null() {
            if !nullable {
                issues.push(issue(name, "must not be null"));
            }
            fields.push((name.clone(), value));
            continue;
        }
        match decode_value(field_type, max_length, value) {
            Ok(decoded) => fields.push((name.clone(), decoded)),
            Err(message) => issues.push(issue(name, &message)),
        }
    }

    if issues.is_empty() {
        Ok(fields)
    } else {
        Err(ValidationError {
            table: String::from(table.name()),
            key: String::from(key),
            issues,
        })
    }
}

fn issue(field: &str, message: &str) -> FieldIssue {
    FieldIssue {
        field: String::from(field),
        message: String::from(message),
    }
}

/// Decodes one non-null value.
pub fn decode_value(
    field_type: &FieldType,
    max_length: Option<u32>,
    value: SqlValue,
) -> Result<SqlValue, String> {
    match (field_type, value) {
        (FieldType::Text, SqlValue::Text(s)) => {
            if let Some(max) = max_length {
                let len = s.chars().count();
                if len > max as usize {
                    return Err(format!("length {len} exceeds {max}"));
                }
            }
            Ok(SqlValue::Text(s))
        }
        (FieldType::Integer, SqlValue::Int(n)) => Ok(SqlValue::Int(n)),
        (FieldType::Real, SqlValue::Float(f)) => Ok(SqlValue::Float(f)),
        #[allow(clippy::cast_precision_loss)]
        (FieldType::Real, SqlValue::Int(n)) => Ok(SqlValue::Float(n as f64)),
        (FieldType::Boolean, SqlValue::Bool(b)) => Ok(SqlValue::Bool(b)),
        (FieldType::Boolean, SqlValue::Int(0)) => Ok(SqlValue::Bool(false)),
        (FieldType::Boolean, SqlValue::Int(1)) => Ok(SqlValue::Bool(true)),
        (FieldType::Datetime, SqlValue::Text(s)) => {
            if is_datetime(&s) {
                Ok(SqlValue::Text(s))
            } else {
                Err(format!("'{s}' is not a date or date-time"))
            }
        }
        (FieldType::Json, SqlValue::Text(s)) => serde_json::from_str(&s)
            .map(SqlValue::Json)
            .map_err(|e| format!("invalid JSON: {e}")),
        (FieldType::Json, SqlValue::Json(v)) => Ok(SqlValue::Json(v)),
        (FieldType::Json, SqlValue::Int(n)) => Ok(SqlValue::Json(n.into())),
        (FieldType::Json, SqlValue::Float(f)) => Ok(SqlValue::Json(f.into())),
        (FieldType::Json, SqlValue::Bool(b)) => Ok(SqlValue::Json(b.into())),
        (FieldType::Custom(_), value) => Ok(value),
        (expected, found) => Err(format!(
            "expected {}, found {}",
            type_name(expected),
            value_kind(&found)
        )),
    }
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

const fn type_name(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "text",
        FieldType::Integer => "integer",
        FieldType::Real => "real",
        FieldType::Boolean => "boolean",
        FieldType::Datetime => "datetime",
        FieldType::Json => "json",
        FieldType::Custom(_) => "custom",
    }
}

const fn value_kind(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "null",
        SqlValue::Bool(_) => "boolean",
        SqlValue::Int(_) => "integer",
        SqlValue::Float(_) => "real",
        SqlValue::Text(_) => "text",
        SqlValue::Blob(_) => "blob",
        SqlValue::Json(_) => "json",
    }
}
