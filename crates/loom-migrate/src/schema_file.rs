//! JSON table model files.
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "users",
//!       "fields": [
//!         { "name": "id", "type": "integer", "primary_key": true, "auto_increment": true },
//!         { "name": "email", "type": "text", "max_length": 255, "unique": true }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Every table goes through [`TableBuilder`], so a file that parses is also
//! a valid set of table definitions.

use std::collections::HashSet;
use std::path::Path;

use loom_sql_core::schema::{
    CompoundForeignKey, CompoundIndex, Field, TableBuilder, TableMetadata,
};
use serde::Deserialize;

use crate::error::{MigrateError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableSpec {
    name: String,
    fields: Vec<Field>,
    #[serde(default)]
    primary_key: Option<Vec<String>>,
    #[serde(default)]
    unique: Vec<Vec<String>>,
    #[serde(default)]
    indexes: Vec<CompoundIndex>,
    #[serde(default)]
    foreign_keys: Vec<CompoundForeignKey>,
}

impl TableSpec {
    fn build(self) -> loom_sql_core::Result<TableMetadata> {
        let mut builder = TableBuilder::new(self.name).fields(self.fields);
        if let Some(columns) = self.primary_key {
            builder = builder.primary_key(columns);
        }
        for columns in self.unique {
            builder = builder.unique(columns);
        }
        for index in self.indexes {
            builder = match index.name {
                Some(name) => builder.named_index(name, index.columns),
                None => builder.index(index.columns),
            };
        }
        for foreign_key in self.foreign_keys {
            builder = builder.foreign_key(foreign_key);
        }
        builder.build()
    }
}

/// Parses a table model document.
pub fn parse(source: &str) -> std::result::Result<Vec<TableMetadata>, String> {
    let file: SchemaFile = serde_json::from_str(source).map_err(|e| e.to_string())?;
    let mut seen = HashSet::new();
    let mut tables = Vec::with_capacity(file.tables.len());
    for spec in file.tables {
        if !seen.insert(spec.name.clone()) {
            return Err(format!("table '{}' is declared twice", spec.name));
        }
        tables.push(spec.build().map_err(|e| e.to_string())?);
    }
    Ok(tables)
}

/// Reads and parses a table model file.
pub fn load(path: &Path) -> Result<Vec<TableMetadata>> {
    let source = std::fs::read_to_string(path)?;
    parse(&source).map_err(|message| MigrateError::SchemaFile {
        path: path.to_path_buf(),
        message,
    })
}
