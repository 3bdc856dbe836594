//! SQL dialect support.
//!
//! The three supported databases differ in how identifiers are quoted, how
//! parameter placeholders are written, and how a handful of builtin
//! expressions are spelled. Everything else in a [`Template`](crate::Template)
//! is dialect-neutral text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    #[serde(alias = "postgresql")]
    Postgres,
    /// MySQL.
    Mysql,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::Postgres, Self::Mysql];

    /// Returns the name of the dialect.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
            Self::Mysql => "mysql",
        }
    }

    /// Returns the identifier quote character (`"` for SQLite and
    /// PostgreSQL, `` ` `` for MySQL).
    #[must_use]
    pub const fn identifier_quote(self) -> char {
        match self {
            Self::Sqlite | Self::Postgres => '"',
            Self::Mysql => '`',
        }
    }

    /// Quotes an identifier, doubling any embedded quote character.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        let q = self.identifier_quote();
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for c in name.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    /// Returns the placeholder for the parameter at the given 1-based
    /// position.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::Sqlite | Self::Mysql => String::from("?"),
        }
    }

    /// Returns whether `ALTER TABLE ... ADD CONSTRAINT` is available.
    #[must_use]
    pub const fn supports_add_constraint(self) -> bool {
        !matches!(self, Self::Sqlite)
    }

    /// Returns whether `CREATE INDEX IF NOT EXISTS` is available.
    #[must_use]
    pub const fn supports_index_if_not_exists(self) -> bool {
        !matches!(self, Self::Mysql)
    }

    /// Returns whether `ALTER TABLE ... ADD COLUMN IF NOT EXISTS` is
    /// available.
    #[must_use]
    pub const fn supports_add_column_if_not_exists(self) -> bool {
        matches!(self, Self::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            other => Err(CoreError::Query(format!("unknown dialect '{other}'"))),
        }
    }
}

/// A SQL builtin expression that is inlined verbatim, never parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlBuiltin {
    /// The current date and time.
    CurrentTimestamp,
    /// The current date.
    CurrentDate,
    /// A freshly generated random UUID.
    RandomUuid,
}

impl SqlBuiltin {
    /// Returns the dialect keyword or expression for this builtin.
    #[must_use]
    pub const fn keyword(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (Self::CurrentTimestamp, _) => "CURRENT_TIMESTAMP",
            (Self::CurrentDate, _) => "CURRENT_DATE",
            (Self::RandomUuid, Dialect::Sqlite) => "lower(hex(randomblob(16)))",
            (Self::RandomUuid, Dialect::Postgres) => "gen_random_uuid()",
            (Self::RandomUuid, Dialect::Mysql) => "UUID()",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_doubles_quotes() {
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
        assert_eq!(
            Dialect::Postgres.quote_identifier("we\"ird"),
            "\"we\"\"ird\""
        );
        assert_eq!(Dialect::Mysql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(Dialect::Mysql.quote_identifier("a\"b"), "`a\"b`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Mysql.placeholder(1), "?");
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
    }

    #[test]
    fn test_parse_dialect() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_builtin_keywords() {
        assert_eq!(
            SqlBuiltin::CurrentTimestamp.keyword(Dialect::Mysql),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(
            SqlBuiltin::RandomUuid.keyword(Dialect::Postgres),
            "gen_random_uuid()"
        );
    }
}
