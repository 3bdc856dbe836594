//! # loom-orm
//!
//! Turns flat result rows keyed `"table.field"` into a deduplicated entity
//! graph.
//!
//! Each table with a primary key yields one entity per distinct key, keyed
//! `"table:pk"`. Forward references (`Field::references`) resolve to the
//! referenced entity and reverse aliases collect the referring entities.
//! All entities live in one arena, so cyclic data is fine.
//!
//! ```rust
//! use loom_orm::normalize;
//! use loom_sql_core::schema::{ForeignKeyRef, TableBuilder, text};
//! use loom_sql_core::{Row, ToSqlValue};
//!
//! let users = TableBuilder::new("users")
//!     .field(text("id").primary())
//!     .field(text("name"))
//!     .build()
//!     .unwrap();
//! let posts = TableBuilder::new("posts")
//!     .field(text("id").primary())
//!     .field(text("authorId").references(ForeignKeyRef::new("users", "id", "author")))
//!     .build()
//!     .unwrap();
//!
//! let row = |post: &str| {
//!     Row::from([
//!         (String::from("posts.id"), post.to_sql_value()),
//!         (String::from("posts.authorId"), "u1".to_sql_value()),
//!         (String::from("users.id"), "u1".to_sql_value()),
//!         (String::from("users.name"), "Alice".to_sql_value()),
//!     ])
//! };
//!
//! let normalized = normalize(&[row("p1"), row("p2")], &[&posts, &users]).unwrap();
//! let first = normalized.get(0).unwrap().reference("author").unwrap();
//! let second = normalized.get(1).unwrap().reference("author").unwrap();
//! assert_eq!(first, second);
//! assert_eq!(first.get("name"), Some(&"Alice".to_sql_value()));
//! ```

mod decode;
pub mod entity;
pub mod error;
mod normalize;

pub use decode::decode_value;
pub use entity::{Entity, EntityGraph, EntityId, EntityRef, Normalized};
pub use error::{FieldIssue, OrmError, Result, ValidationError};
pub use normalize::{NormalizeOptions, ReferencePolicy, normalize, normalize_with};
