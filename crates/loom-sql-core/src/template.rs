//! Composable SQL templates.
//!
//! A [`Template`] is an ordered list of literal segments interleaved with
//! values, always holding exactly one more segment than values. Literal text
//! supplied by callers must be `&'static str`, so runtime strings can only
//! enter a template as a bound parameter or as a quoted identifier.
//!
//! Nested templates are spliced in when they are added, which keeps every
//! template flat: rendering never recurses, and composing deep fragment
//! trees costs time linear in the total number of segments.
//!
//! ```rust
//! use loom_sql_core::{Dialect, Template, ident, param};
//!
//! let filter = Template::from_parts(&[" WHERE ", " = ", ""], vec![ident("email"), param("a@b.c")])
//!     .unwrap();
//! let query = Template::raw("SELECT * FROM ").ident("users").append(filter);
//!
//! let rendered = query.render(Dialect::Postgres);
//! assert_eq!(rendered.sql, r#"SELECT * FROM "users" WHERE "email" = $1"#);
//! assert_eq!(rendered.params.len(), 1);
//! ```

use crate::dialect::{Dialect, SqlBuiltin};
use crate::error::{CoreError, Result};
use crate::render::{self, Rendered};
use crate::value::{SqlValue, ToSqlValue};

/// A value stored between two literal segments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A bound parameter.
    Param(SqlValue),
    /// A table, column or index name, quoted at render time.
    Ident(String),
    /// A builtin expression, resolved to its dialect keyword at render time.
    Builtin(SqlBuiltin),
}

/// An argument accepted when building a template from parts.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A bound parameter.
    Param(SqlValue),
    /// An identifier marker.
    Ident(String),
    /// A SQL builtin marker.
    Builtin(SqlBuiltin),
    /// A template spliced in place.
    Nested(Template),
}

/// Wraps a value as a parameter argument.
pub fn param(value: impl ToSqlValue) -> Arg {
    Arg::Param(value.to_sql_value())
}

/// Wraps a name as an identifier argument.
pub fn ident(name: impl Into<String>) -> Arg {
    Arg::Ident(name.into())
}

/// Wraps a builtin as an argument.
#[must_use]
pub const fn builtin(builtin: SqlBuiltin) -> Arg {
    Arg::Builtin(builtin)
}

/// Wraps a template as an argument to be spliced in.
#[must_use]
pub const fn nested(template: Template) -> Arg {
    Arg::Nested(template)
}

/// A composable SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<String>,
    values: Vec<Value>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: vec![String::new()],
            values: Vec::new(),
        }
    }

    /// Creates a template holding a single literal segment.
    #[must_use]
    pub fn raw(sql: &'static str) -> Self {
        Self {
            segments: vec![String::from(sql)],
            values: Vec::new(),
        }
    }

    /// Builds a template from literal segments and the values between them.
    ///
    /// `segments` must hold exactly one more entry than `args`.
    pub fn from_parts(segments: &[&'static str], args: Vec<Arg>) -> Result<Self> {
        if segments.len() != args.len() + 1 {
            return Err(CoreError::Query(format!(
                "template needs {} segments for {} values, got {}",
                args.len() + 1,
                args.len(),
                segments.len()
            )));
        }
        let mut template = Self::raw(segments[0]);
        for (arg, segment) in args.into_iter().zip(&segments[1..]) {
            template.push_arg(arg);
            template.push_text(segment);
        }
        Ok(template)
    }

    /// Appends literal SQL text.
    #[must_use]
    pub fn sql(mut self, sql: &'static str) -> Self {
        self.push_text(sql);
        self
    }

    /// Appends a bound parameter.
    #[must_use]
    pub fn param(mut self, value: impl ToSqlValue) -> Self {
        self.push_value(Value::Param(value.to_sql_value()));
        self
    }

    /// Appends an identifier.
    #[must_use]
    pub fn ident(mut self, name: impl Into<String>) -> Self {
        self.push_value(Value::Ident(name.into()));
        self
    }

    /// Appends a `"table"."column"` pair.
    #[must_use]
    pub fn qualified(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.ident(table).sql(".").ident(column)
    }

    /// Appends a builtin expression.
    #[must_use]
    pub fn builtin(mut self, builtin: SqlBuiltin) -> Self {
        self.push_value(Value::Builtin(builtin));
        self
    }

    /// Splices another template onto the end of this one.
    #[must_use]
    pub fn append(mut self, fragment: Self) -> Self {
        merge(&mut self, fragment);
        self
    }

    /// Joins templates with a literal separator.
    #[must_use]
    pub fn join(templates: impl IntoIterator<Item = Self>, separator: &'static str) -> Self {
        let mut out = Self::new();
        for (i, template) in templates.into_iter().enumerate() {
            if i > 0 {
                out.push_text(separator);
            }
            merge(&mut out, template);
        }
        out
    }

    /// Appends an argument, splicing nested templates.
    pub fn push_arg(&mut self, arg: Arg) {
        match arg {
            Arg::Param(v) => self.push_value(Value::Param(v)),
            Arg::Ident(name) => self.push_value(Value::Ident(name)),
            Arg::Builtin(b) => self.push_value(Value::Builtin(b)),
            Arg::Nested(inner) => merge(self, inner),
        }
    }

    /// Appends text that the crate itself produced (type names, escaped
    /// literals, dialect keywords). Never exposed to callers.
    pub(crate) fn push_text(&mut self, text: &str) {
        if let Some(last) = self.segments.last_mut() {
            last.push_str(text);
        }
    }

    /// Owned-text counterpart of [`Template::sql`] for crate-generated text.
    #[must_use]
    pub(crate) fn text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    fn push_value(&mut self, value: Value) {
        self.values.push(value);
        self.segments.push(String::new());
    }

    /// Returns the literal segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the values between the segments.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of bound parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| matches!(v, Value::Param(_)))
            .count()
    }

    /// Returns `true` when the template renders to an empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.segments.iter().all(String::is_empty)
    }

    /// Renders the template for a dialect.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> Rendered {
        render::render(self, dialect)
    }

    /// Renders a parameter-free template (DDL, diagnostics).
    pub fn render_ddl(&self, dialect: Dialect) -> Result<String> {
        render::render_ddl(self, dialect)
    }
}

impl From<&'static str> for Template {
    fn from(sql: &'static str) -> Self {
        Self::raw(sql)
    }
}

/// Splices `fragment` onto the end of `into`.
///
/// The fragment's first segment is appended to the accumulator's last
/// segment; its remaining values and segments follow in order. String
/// content is never inspected.
pub fn merge(into: &mut Template, fragment: Template) {
    let mut segments = fragment.segments.into_iter();
    if let Some(first) = segments.next() {
        into.push_text(&first);
    }
    into.values.extend(fragment.values);
    into.segments.extend(segments);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(t: &Template) {
        assert_eq!(t.segments().len(), t.values().len() + 1);
    }

    #[test]
    fn test_from_parts_checks_segment_count() {
        let err = Template::from_parts(&["a", "b"], vec![]).unwrap_err();
        assert!(matches!(err, CoreError::Query(_)));
        let ok = Template::from_parts(&["a = ", ""], vec![param(1)]).unwrap();
        assert_invariant(&ok);
        assert_eq!(ok.param_count(), 1);
    }

    #[test]
    fn test_merge_joins_boundary_segments() {
        let mut left = Template::raw("SELECT ").ident("a").sql(" FROM ");
        let right = Template::new().ident("t").sql(" WHERE x = ").param(1);
        merge(&mut left, right);
        assert_invariant(&left);
        assert_eq!(left.segments(), ["SELECT ", " FROM ", " WHERE x = ", ""]);
        assert_eq!(left.values().len(), 3);
    }

    #[test]
    fn test_nested_args_are_flattened() {
        let inner = Template::from_parts(&["(", " + ", ")"], vec![param(1), param(2)]).unwrap();
        let outer =
            Template::from_parts(&["SELECT ", " AS ", ""], vec![nested(inner), ident("n")])
                .unwrap();
        assert_invariant(&outer);
        assert_eq!(outer.values().len(), 3);
        assert_eq!(outer.segments(), ["SELECT (", " + ", ") AS ", ""]);
    }

    #[test]
    fn test_deep_nesting_stays_flat() {
        let mut t = Template::raw("x");
        for _ in 0..1000 {
            t = Template::raw("(").append(t).sql(" + ").param(1).sql(")");
        }
        assert_invariant(&t);
        assert_eq!(t.param_count(), 1000);
    }

    #[test]
    fn test_join() {
        let joined = Template::join(
            vec![Template::new().ident("a"), Template::new().ident("b")],
            ", ",
        );
        assert_invariant(&joined);
        assert_eq!(joined.segments(), ["", ", ", ""]);
        assert!(Template::join(Vec::new(), ", ").is_empty());
    }
}
