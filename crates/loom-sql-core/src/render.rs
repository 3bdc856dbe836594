//! Dialect rendering of templates into SQL text and parameter lists.

use crate::dialect::Dialect;
use crate::error::{CoreError, Result};
use crate::template::{Template, Value};
use crate::value::SqlValue;

/// A rendered statement: SQL text plus parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Final SQL text.
    pub sql: String,
    /// Parameters, left to right.
    pub params: Vec<SqlValue>,
}

impl Rendered {
    /// Splits into `(sql, params)`.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

/// Renders a template for a dialect.
///
/// Identifiers are quoted and builtins resolved inline; every other value
/// becomes a parameter with a placeholder. PostgreSQL placeholders are
/// numbered from `$1` over parameters only.
#[must_use]
pub fn render(template: &Template, dialect: Dialect) -> Rendered {
    let mut sql = String::new();
    let mut params = Vec::new();
    let segments = template.segments();
    for (i, value) in template.values().iter().enumerate() {
        sql.push_str(&segments[i]);
        match value {
            Value::Ident(name) => sql.push_str(&dialect.quote_identifier(name)),
            Value::Builtin(b) => sql.push_str(b.keyword(dialect)),
            Value::Param(v) => {
                params.push(v.clone());
                sql.push_str(&dialect.placeholder(params.len()));
            }
        }
    }
    if let Some(last) = segments.last() {
        sql.push_str(last);
    }
    Rendered { sql, params }
}

/// Renders a template that must not carry runtime values.
///
/// Fails on anything other than an identifier.
pub fn render_ddl(template: &Template, dialect: Dialect) -> Result<String> {
    let mut sql = String::new();
    let segments = template.segments();
    for (i, value) in template.values().iter().enumerate() {
        sql.push_str(&segments[i]);
        match value {
            Value::Ident(name) => sql.push_str(&dialect.quote_identifier(name)),
            Value::Param(v) => {
                return Err(CoreError::Query(format!(
                    "DDL must not contain parameters, found {v:?} after `{sql}`"
                )));
            }
            Value::Builtin(b) => {
                return Err(CoreError::Query(format!(
                    "DDL must not contain builtin markers, found {b:?} after `{sql}`"
                )));
            }
        }
    }
    if let Some(last) = segments.last() {
        sql.push_str(last);
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlBuiltin;

    #[test]
    fn test_identifiers_only_have_no_params() {
        let t = Template::raw("SELECT ")
            .qualified("users", "id")
            .sql(" FROM ")
            .ident("users");
        for dialect in Dialect::ALL {
            assert!(render(&t, dialect).params.is_empty());
        }
        assert_eq!(
            render(&t, Dialect::Mysql).sql,
            "SELECT `users`.`id` FROM `users`"
        );
    }

    #[test]
    fn test_postgres_numbering_skips_identifiers() {
        let t = Template::raw("SELECT ")
            .ident("a")
            .sql(", ")
            .ident("b")
            .sql(" FROM ")
            .ident("t")
            .sql(" WHERE id = ")
            .param(1)
            .sql(" OR id = ")
            .param(2);
        let r = render(&t, Dialect::Postgres);
        assert_eq!(
            r.sql,
            r#"SELECT "a", "b" FROM "t" WHERE id = $1 OR id = $2"#
        );
        assert_eq!(r.params, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_builtin_is_inlined() {
        let t = Template::raw("UPDATE ")
            .ident("t")
            .sql(" SET at = ")
            .builtin(SqlBuiltin::CurrentTimestamp);
        let r = render(&t, Dialect::Sqlite);
        assert_eq!(r.sql, r#"UPDATE "t" SET at = CURRENT_TIMESTAMP"#);
        assert!(r.params.is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let t = Template::raw("SELECT ").param("x").sql(", ").ident("y");
        assert_eq!(render(&t, Dialect::Postgres), render(&t, Dialect::Postgres));
    }

    #[test]
    fn test_render_ddl_rejects_params() {
        let ok = Template::raw("DROP TABLE ").ident("t");
        assert_eq!(render_ddl(&ok, Dialect::Sqlite).unwrap(), r#"DROP TABLE "t""#);

        let bad = Template::raw("CREATE TABLE t (x INTEGER DEFAULT ").param(1).sql(")");
        assert!(matches!(
            render_ddl(&bad, Dialect::Sqlite),
            Err(CoreError::Query(_))
        ));
    }
}
