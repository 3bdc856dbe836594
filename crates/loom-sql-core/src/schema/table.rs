//! Table metadata and its validating builder.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{CoreError, Result};
use crate::template::Template;

use super::field::{Field, FieldType, ForeignKeyRef, OnDelete};

/// Where a table's primary key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PrimaryKey {
    /// The table has no primary key.
    #[default]
    None,
    /// A single field carries the primary-key flag.
    Field(String),
    /// A compound key declared on the table.
    Compound(Vec<String>),
}

impl PrimaryKey {
    /// Returns the key columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Field(name) => std::slice::from_ref(name),
            Self::Compound(columns) => columns,
        }
    }

    /// Returns `true` when the table has no primary key.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A named or anonymous index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompoundIndex {
    /// Explicit index name. Generated when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Indexed columns.
    pub columns: Vec<String>,
}

/// A foreign key over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompoundForeignKey {
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub references_table: String,
    /// Referenced columns, matched positionally.
    pub references_columns: Vec<String>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: Option<OnDelete>,
}

/// A computed field, selected through its SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedField {
    /// Field name, used in the `"table.field"` alias.
    pub name: String,
    /// Semantic type of the computed value.
    pub field_type: FieldType,
    /// Expression producing the value.
    pub expression: Template,
}

/// Validated metadata describing one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    name: String,
    fields: Vec<Field>,
    primary_key: PrimaryKey,
    unique: Vec<Vec<String>>,
    foreign_keys: Vec<CompoundForeignKey>,
    indexes: Vec<CompoundIndex>,
    derived: Vec<DerivedField>,
}

impl TableMetadata {
    /// Starts a builder for a table.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stored fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a stored field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key.
    #[must_use]
    pub const fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    /// Returns the compound unique constraints.
    #[must_use]
    pub fn unique_constraints(&self) -> &[Vec<String>] {
        &self.unique
    }

    /// Returns the compound foreign keys.
    #[must_use]
    pub fn foreign_keys(&self) -> &[CompoundForeignKey] {
        &self.foreign_keys
    }

    /// Returns the compound indexes.
    #[must_use]
    pub fn indexes(&self) -> &[CompoundIndex] {
        &self.indexes
    }

    /// Returns the derived fields.
    #[must_use]
    pub fn derived(&self) -> &[DerivedField] {
        &self.derived
    }

    /// Iterates over fields carrying a single-field reference.
    pub fn references(&self) -> impl Iterator<Item = (&Field, &ForeignKeyRef)> {
        self.fields
            .iter()
            .filter_map(|f| f.references.as_ref().map(|r| (f, r)))
    }

    /// Returns `true` if `name` is the sole primary-key column.
    #[must_use]
    pub fn is_single_primary_key(&self, name: &str) -> bool {
        matches!(&self.primary_key, PrimaryKey::Field(pk) if pk == name)
    }

    /// Returns `true` if the column takes part in a key, unique constraint,
    /// index or foreign key, declared on the field or on the table.
    #[must_use]
    pub fn is_key_column(&self, name: &str) -> bool {
        let named = |columns: &[String]| columns.iter().any(|c| c == name);
        self.field(name).is_some_and(Field::is_key)
            || named(self.primary_key.columns())
            || self.unique.iter().any(|cols| named(cols))
            || self.indexes.iter().any(|idx| named(&idx.columns))
            || self.foreign_keys.iter().any(|fk| named(&fk.columns))
    }

    /// Keeps only the named stored or derived fields.
    ///
    /// Constraints that touch a removed field are dropped.
    pub fn pick(&self, names: &[&str]) -> Result<Self> {
        self.check_known(names)?;
        Ok(self.project(|name| names.contains(&name)))
    }

    /// Removes the named stored or derived fields.
    pub fn omit(&self, names: &[&str]) -> Result<Self> {
        self.check_known(names)?;
        Ok(self.project(|name| !names.contains(&name)))
    }

    /// Returns a copy with an additional derived field.
    pub fn with_derived(
        &self,
        name: impl Into<String>,
        field_type: FieldType,
        expression: Template,
    ) -> Result<Self> {
        let name = name.into();
        check_name("derived field", &name)?;
        if self.field(&name).is_some() || self.derived.iter().any(|d| d.name == name) {
            return Err(CoreError::TableDefinition(format!(
                "table '{}' already has a field named '{name}'",
                self.name
            )));
        }
        let mut table = self.clone();
        table.derived.push(DerivedField {
            name,
            field_type,
            expression,
        });
        Ok(table)
    }

    fn check_known(&self, names: &[&str]) -> Result<()> {
        for name in names {
            let known =
                self.field(name).is_some() || self.derived.iter().any(|d| d.name == *name);
            if !known {
                return Err(CoreError::TableDefinition(format!(
                    "table '{}' has no field '{name}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn project(&self, keep: impl Fn(&str) -> bool) -> Self {
        let all_kept = |columns: &[String]| columns.iter().all(|c| keep(c));
        let primary_key = if all_kept(self.primary_key.columns()) {
            self.primary_key.clone()
        } else {
            PrimaryKey::None
        };
        Self {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .filter(|f| keep(&f.name))
                .cloned()
                .collect(),
            primary_key,
            unique: self
                .unique
                .iter()
                .filter(|cols| all_kept(cols))
                .cloned()
                .collect(),
            foreign_keys: self
                .foreign_keys
                .iter()
                .filter(|fk| all_kept(&fk.columns))
                .cloned()
                .collect(),
            indexes: self
                .indexes
                .iter()
                .filter(|idx| all_kept(&idx.columns))
                .cloned()
                .collect(),
            derived: self
                .derived
                .iter()
                .filter(|d| keep(&d.name))
                .cloned()
                .collect(),
        }
    }
}

/// Builder for [`TableMetadata`].
///
/// ```rust
/// use loom_sql_core::schema::{TableBuilder, integer, text};
///
/// let members = TableBuilder::new("members")
///     .field(integer("teamId"))
///     .field(integer("userId"))
///     .field(text("role").optional())
///     .primary_key(["teamId", "userId"])
///     .index(["role"])
///     .build()
///     .unwrap();
/// assert_eq!(members.primary_key().columns(), ["teamId", "userId"]);
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    fields: Vec<Field>,
    primary_key: Option<Vec<String>>,
    unique: Vec<Vec<String>>,
    foreign_keys: Vec<CompoundForeignKey>,
    indexes: Vec<CompoundIndex>,
    derived: Vec<DerivedField>,
}

impl TableBuilder {
    /// Creates a builder for the named table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: None,
            unique: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            derived: Vec::new(),
        }
    }

    /// Adds a stored field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds several stored fields.
    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Declares a compound primary key.
    #[must_use]
    pub fn primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Declares a compound unique constraint.
    #[must_use]
    pub fn unique<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Declares an index with a generated name.
    #[must_use]
    pub fn index<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.indexes.push(CompoundIndex {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares an index with an explicit name.
    #[must_use]
    pub fn named_index<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.indexes.push(CompoundIndex {
            name: Some(name.into()),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares a compound foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: CompoundForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a derived field.
    #[must_use]
    pub fn derived(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        expression: Template,
    ) -> Self {
        self.derived.push(DerivedField {
            name: name.into(),
            field_type,
            expression,
        });
        self
    }

    /// Validates the declaration and produces the metadata.
    pub fn build(self) -> Result<TableMetadata> {
        let table = self.name.as_str();
        check_name("table", table)?;

        let mut names = HashSet::new();
        for field in &self.fields {
            check_name("field", &field.name)?;
            if !names.insert(field.name.as_str()) {
                return Err(definition(table, format!("duplicate field '{}'", field.name)));
            }
            if field.auto_increment && !field.primary_key {
                return Err(definition(
                    table,
                    format!("auto-increment field '{}' must be the primary key", field.name),
                ));
            }
            if let Some(reference) = &field.references {
                check_name("table", &reference.table)?;
                check_name("field", &reference.field)?;
                check_name("alias", &reference.alias)?;
                if let Some(reverse) = &reference.reverse_alias {
                    check_name("alias", reverse)?;
                }
            }
        }
        let stored: HashSet<&str> = names.clone();
        for derived in &self.derived {
            check_name("derived field", &derived.name)?;
            if !names.insert(derived.name.as_str()) {
                return Err(definition(table, format!("duplicate field '{}'", derived.name)));
            }
        }
        for field in &self.fields {
            if let Some(reference) = &field.references {
                if names.contains(reference.alias.as_str()) {
                    return Err(definition(
                        table,
                        format!("alias '{}' collides with a field", reference.alias),
                    ));
                }
            }
        }

        let flagged: Vec<&Field> = self.fields.iter().filter(|f| f.primary_key).collect();
        let primary_key = match (flagged.as_slice(), &self.primary_key) {
            ([], None) => PrimaryKey::None,
            ([field], None) => PrimaryKey::Field(field.name.clone()),
            ([], Some(columns)) => {
                check_columns(table, "primary key", columns, &stored)?;
                PrimaryKey::Compound(columns.clone())
            }
            _ => return Err(definition(table, String::from("more than one primary key"))),
        };

        for (i, columns) in self.unique.iter().enumerate() {
            check_columns(table, "unique constraint", columns, &stored)?;
            if self.unique[..i].contains(columns) {
                return Err(definition(
                    table,
                    format!("unique constraint ({}) declared twice", columns.join(", ")),
                ));
            }
        }

        for (i, index) in self.indexes.iter().enumerate() {
            if let Some(name) = &index.name {
                check_name("index", name)?;
            }
            check_columns(table, "index", &index.columns, &stored)?;
            let duplicate = self.indexes[..i].iter().any(|other| {
                other.columns == index.columns
                    || (other.name.is_some() && other.name == index.name)
            });
            if duplicate {
                return Err(definition(
                    table,
                    format!("index ({}) declared twice", index.columns.join(", ")),
                ));
            }
        }

        for (i, fk) in self.foreign_keys.iter().enumerate() {
            check_columns(table, "foreign key", &fk.columns, &stored)?;
            check_name("table", &fk.references_table)?;
            for column in &fk.references_columns {
                check_name("field", column)?;
            }
            if fk.columns.len() != fk.references_columns.len() {
                return Err(definition(
                    table,
                    format!(
                        "foreign key ({}) references {} columns",
                        fk.columns.join(", "),
                        fk.references_columns.len()
                    ),
                ));
            }
            if self.foreign_keys[..i].iter().any(|other| other.columns == fk.columns) {
                return Err(definition(
                    table,
                    format!("foreign key ({}) declared twice", fk.columns.join(", ")),
                ));
            }
        }

        Ok(TableMetadata {
            name: self.name,
            fields: self.fields,
            primary_key,
            unique: self.unique,
            foreign_keys: self.foreign_keys,
            indexes: self.indexes,
            derived: self.derived,
        })
    }
}

fn definition(table: &str, message: String) -> CoreError {
    CoreError::TableDefinition(format!("table '{table}': {message}"))
}

/// Checks a table, field, alias or index name.
pub(crate) fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::TableDefinition(format!("{kind} name is empty")));
    }
    if name.contains('.') {
        return Err(CoreError::TableDefinition(format!(
            "{kind} name '{name}' must not contain '.'"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(CoreError::TableDefinition(format!(
            "{kind} name {name:?} contains control characters"
        )));
    }
    Ok(())
}

fn check_columns(
    table: &str,
    kind: &str,
    columns: &[String],
    stored: &HashSet<&str>,
) -> Result<()> {
    if columns.is_empty() {
        return Err(definition(table, format!("{kind} has no columns")));
    }
    for (i, column) in columns.iter().enumerate() {
        if !stored.contains(column.as_str()) {
            return Err(definition(
                table,
                format!("{kind} names unknown column '{column}'"),
            ));
        }
        if columns[..i].contains(column) {
            return Err(definition(
                table,
                format!("{kind} lists column '{column}' twice"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{integer, text};

    fn users() -> TableMetadata {
        TableBuilder::new("users")
            .field(text("id").primary())
            .field(text("name"))
            .field(text("email").unique())
            .unique(["name", "email"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_single_primary_key() {
        let table = users();
        assert_eq!(table.primary_key(), &PrimaryKey::Field(String::from("id")));
        assert!(table.is_single_primary_key("id"));
    }

    #[test]
    fn test_rejects_bad_names() {
        for bad in ["", "a.b", "tab\tle"] {
            let err = TableBuilder::new(bad).build().unwrap_err();
            assert!(matches!(err, CoreError::TableDefinition(_)), "{bad:?}");
        }
        let err = TableBuilder::new("t").field(text("x.y")).build();
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_duplicate_fields() {
        let err = TableBuilder::new("t")
            .field(text("a"))
            .field(integer("a"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::TableDefinition(String::from("table 't': duplicate field 'a'"))
        );
    }

    #[test]
    fn test_rejects_two_primary_keys() {
        let flag_and_compound = TableBuilder::new("t")
            .field(text("a").primary())
            .field(text("b"))
            .primary_key(["a", "b"])
            .build();
        assert!(flag_and_compound.is_err());

        let two_flags = TableBuilder::new("t")
            .field(text("a").primary())
            .field(text("b").primary())
            .build();
        assert!(two_flags.is_err());
    }

    #[test]
    fn test_rejects_unknown_and_duplicate_constraint_columns() {
        let unknown = TableBuilder::new("t").field(text("a")).unique(["b"]).build();
        assert!(unknown.is_err());

        let twice = TableBuilder::new("t")
            .field(text("a"))
            .field(text("b"))
            .index(["a", "b"])
            .index(["a", "b"])
            .build();
        assert!(twice.is_err());
    }

    #[test]
    fn test_auto_increment_requires_primary_key() {
        let err = TableBuilder::new("t")
            .field(integer("n").auto_increment())
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_pick_drops_constraints_on_removed_fields() {
        let table = users();
        let picked = table.pick(&["id", "email"]).unwrap();
        assert_eq!(picked.fields().len(), 2);
        assert!(picked.unique_constraints().is_empty());
        assert!(!picked.primary_key().is_none());
        // the source is untouched
        assert_eq!(table.unique_constraints().len(), 1);

        let omitted = table.omit(&["id"]).unwrap();
        assert!(omitted.primary_key().is_none());
        assert!(table.pick(&["missing"]).is_err());
    }

    #[test]
    fn test_with_derived() {
        let table = users()
            .with_derived(
                "nameLength",
                FieldType::Integer,
                Template::raw("length(").qualified("users", "name").sql(")"),
            )
            .unwrap();
        assert_eq!(table.derived().len(), 1);
        assert!(table
            .with_derived("name", FieldType::Text, Template::raw("1"))
            .is_err());
    }
}
