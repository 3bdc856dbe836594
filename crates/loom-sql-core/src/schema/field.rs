//! Field descriptors.
//!
//! Fields are plain values modified through consuming builder methods:
//!
//! ```rust
//! use loom_sql_core::schema::{ForeignKeyRef, OnDelete, integer, text};
//!
//! let id = integer("id").primary().auto_increment();
//! let email = text("email").max_length(255).unique();
//! let author = text("authorId").references(
//!     ForeignKeyRef::new("users", "id", "author")
//!         .reverse("posts")
//!         .on_delete(OnDelete::Cascade),
//! );
//! assert!(id.primary_key && email.unique && author.references.is_some());
//! ```

use serde::{Deserialize, Serialize};

use crate::dialect::SqlBuiltin;
use crate::value::SqlValue;

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text. Limited by [`Field::max_length`] when set.
    Text,
    /// 64-bit integer.
    Integer,
    /// Floating point.
    Real,
    /// Boolean.
    Boolean,
    /// Date and time, stored as ISO-8601 text where the database has no
    /// native type.
    Datetime,
    /// Structured JSON.
    Json,
    /// A database-specific type, emitted verbatim.
    Custom(String),
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(String),
    /// A builtin such as the current timestamp.
    Builtin(SqlBuiltin),
    /// Raw SQL expression from the table definition.
    Expression(String),
}

impl DefaultValue {
    /// Returns the literal as a SQL value, when it is one.
    #[must_use]
    pub fn as_sql_value(&self) -> Option<SqlValue> {
        match self {
            Self::Null => Some(SqlValue::Null),
            Self::Bool(b) => Some(SqlValue::Bool(*b)),
            Self::Int(n) => Some(SqlValue::Int(*n)),
            Self::Float(f) => Some(SqlValue::Float(*f)),
            Self::Text(s) => Some(SqlValue::Text(s.clone())),
            Self::Builtin(_) | Self::Expression(_) => None,
        }
    }
}

/// Foreign key `ON DELETE` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Delete referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// Refuse the delete.
    Restrict,
}

impl OnDelete {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// A single-field reference to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: String,
    /// Referenced field.
    pub field: String,
    /// Name under which the referenced entity is attached.
    pub alias: String,
    /// Name under which the referenced entity lists its referrers.
    #[serde(default)]
    pub reverse_alias: Option<String>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: Option<OnDelete>,
}

impl ForeignKeyRef {
    /// Creates a reference to `table.field`, attached as `alias`.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            alias: alias.into(),
            reverse_alias: None,
            on_delete: None,
        }
    }

    /// Sets the has-many alias on the referenced table.
    #[must_use]
    pub fn reverse(mut self, alias: impl Into<String>) -> Self {
        self.reverse_alias = Some(alias.into());
        self
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// A stored field of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field (column) name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Maximum length for text fields.
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub nullable: bool,
    /// Database-side default value.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Whether the application supplies a value when none is given.
    #[serde(default)]
    pub app_default: bool,
    /// Whether this field is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this field auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Whether this field carries a single-field UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Whether this field gets a plain index.
    #[serde(default)]
    pub indexed: bool,
    /// Foreign key reference, if any.
    #[serde(default)]
    pub references: Option<ForeignKeyRef>,
    /// Explicit SQL type, overriding the type mapping.
    #[serde(default)]
    pub sql_type: Option<String>,
}

impl Field {
    /// Creates a required field of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            max_length: None,
            nullable: false,
            default: None,
            app_default: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            indexed: false,
            references: None,
            sql_type: None,
        }
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are implicitly NOT NULL
        self
    }

    /// Marks the field as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the field as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Requests a plain index on the field.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Allows NULL.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the database default.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Declares that the application fills this field when omitted.
    #[must_use]
    pub fn app_default(mut self) -> Self {
        self.app_default = true;
        self
    }

    /// Limits the length of a text field.
    #[must_use]
    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Overrides the SQL type.
    #[must_use]
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Adds a foreign key reference.
    #[must_use]
    pub fn references(mut self, reference: ForeignKeyRef) -> Self {
        self.references = Some(reference);
        self
    }

    /// Returns whether the field can be omitted on insert.
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.app_default || self.default.is_some()
    }

    /// Returns whether the column is declared NOT NULL.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !(self.nullable || self.has_default() || self.auto_increment)
    }

    /// Returns whether the field is part of a key or index on its own
    /// (primary key, unique, indexed or referencing).
    #[must_use]
    pub const fn is_key(&self) -> bool {
        self.primary_key || self.unique || self.indexed || self.references.is_some()
    }
}

/// Creates a text field.
#[must_use]
pub fn text(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Text)
}

/// Creates an integer field.
#[must_use]
pub fn integer(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Integer)
}

/// Creates a floating point field.
#[must_use]
pub fn real(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Real)
}

/// Creates a boolean field.
#[must_use]
pub fn boolean(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Boolean)
}

/// Creates a date-time field.
#[must_use]
pub fn datetime(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Datetime)
}

/// Creates a JSON field.
#[must_use]
pub fn json(name: impl Into<String>) -> Field {
    Field::new(name, FieldType::Json)
}

/// Creates a field of a database-specific type.
#[must_use]
pub fn custom(name: impl Into<String>, sql_type: impl Into<String>) -> Field {
    Field::new(name, FieldType::Custom(sql_type.into()))
}
