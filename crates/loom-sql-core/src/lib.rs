//! # loom-sql-core
//!
//! Injection-safe SQL composition for SQLite, PostgreSQL and MySQL.
//!
//! This crate provides:
//! - Flat, composable [`Template`]s where runtime values can only appear as
//!   bound parameters or quoted identifiers
//! - A dialect renderer handling identifier quoting and placeholder numbering
//! - Table metadata with validating builders
//! - SELECT column lists aliased as `"table.field"`
//! - DDL generation per dialect
//!
//! ## Composing Templates
//!
//! ```rust
//! use loom_sql_core::{Dialect, Template};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let filter = Template::raw("WHERE ").ident("name").sql(" = ").param(user_input);
//! let query = Template::raw("SELECT ")
//!     .ident("id")
//!     .sql(" FROM ")
//!     .ident("users")
//!     .sql(" ")
//!     .append(filter);
//!
//! let rendered = query.render(Dialect::Postgres);
//! assert_eq!(rendered.sql, r#"SELECT "id" FROM "users" WHERE "name" = $1"#);
//! assert_eq!(rendered.params.len(), 1);
//! ```

pub mod builder;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod render;
pub mod schema;
pub mod template;
pub mod value;

pub use builder::{EntitySelect, build_select_columns, raw_query, select_columns};
pub use ddl::generate_ddl;
pub use dialect::{Dialect, SqlBuiltin};
pub use error::{CoreError, Result};
pub use render::{Rendered, render, render_ddl};
pub use schema::{Field, FieldType, TableBuilder, TableMetadata};
pub use template::{Arg, Template, Value, builtin, ident, merge, nested, param};
pub use value::{Row, SqlValue, ToSqlValue};
