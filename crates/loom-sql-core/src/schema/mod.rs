//! Table metadata.
//!
//! A table is declared once with [`TableBuilder`] and validated on
//! [`TableBuilder::build`]. The resulting [`TableMetadata`] drives column
//! selection, DDL generation, normalization and drift detection.

mod field;
mod table;

pub use field::{
    DefaultValue, Field, FieldType, ForeignKeyRef, OnDelete, boolean, custom, datetime, integer,
    json, real, text,
};
pub use table::{
    CompoundForeignKey, CompoundIndex, DerivedField, PrimaryKey, TableBuilder, TableMetadata,
};
