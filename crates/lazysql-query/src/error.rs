//! Error types for statement construction.

use thiserror::Error;

/// Errors raised while validating arguments or building a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// No table name was supplied.
    #[error("table name is required")]
    MissingTableName,

    /// An insert or update was requested without any column values.
    #[error("values are required")]
    MissingValues,

    /// An update was requested without a where condition.
    #[error("where clause is required")]
    MissingWhereClause,

    /// The query builder rejected the statement.
    #[error("failed to build statement: {0}")]
    Build(String),
}
