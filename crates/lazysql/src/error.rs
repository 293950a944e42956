//! Error type for the query façade.

use lazysql_db::DbError;
use lazysql_query::StatementError;
use thiserror::Error;

/// Errors returned by [`Database`](crate::Database) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection lifecycle or statement execution failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The statement could not be built from the given arguments.
    #[error(transparent)]
    Statement(#[from] StatementError),
}
