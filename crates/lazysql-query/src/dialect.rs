//! SQL dialects understood by the statement builder.

use std::fmt;
use std::str::FromStr;

/// A single result row (or a set of column values to write), keyed by
/// column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// SQLite (double-quoted identifiers).
    #[default]
    Sqlite,
    /// MySQL / MariaDB (backtick identifiers).
    Mysql,
    /// PostgreSQL (double-quoted identifiers).
    Postgres,
}

impl Dialect {
    /// Human-readable dialect name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Mysql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a dialect name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDialectError(String);

impl fmt::Display for ParseDialectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown SQL dialect: {}", self.0)
    }
}

impl std::error::Error for ParseDialectError {}

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ParseDialectError(other.to_string())),
        }
    }
}
