//! Query building over table metadata.
//!
//! Column lists alias every column as `"table.field"`, the row shape the
//! entity normalizer consumes. Anything past `FROM <main>` is a caller
//! supplied [`Template`](crate::Template), so filter values stay bound
//! parameters.

mod select;

pub use select::{EntitySelect, build_select_columns, column_alias, raw_query, select_columns};
