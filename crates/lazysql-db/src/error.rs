//! Error types for the connection lifecycle layer.

use thiserror::Error;

/// Errors reported by a [`Driver`](crate::Driver) implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection pool could not be built or could not hand out a
    /// connection in time.
    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The connection was already released or ended.
    #[error("connection is closed")]
    Closed,

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Any other driver failure.
    #[error("{0}")]
    Other(String),
}

impl From<tokio::task::JoinError> for DriverError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Errors raised by the [`ConnectionManager`](crate::ConnectionManager) and
/// by statement execution.
#[derive(Debug, Error)]
pub enum DbError {
    /// No configuration was supplied and none has been cached yet.
    #[error("database configuration is missing")]
    ConfigurationMissing,

    /// The supplied configuration was rejected.
    #[error("invalid database configuration: {0}")]
    InvalidConfiguration(String),

    /// The driver could not create a connection pool.
    #[error("failed to create connection pool: {0}")]
    PoolCreationFailed(#[source] DriverError),

    /// The driver could not open or hand out a connection.
    #[error("failed to create connection: {0}")]
    ConnectionCreationFailed(#[source] DriverError),

    /// No valid connection was available to run a statement.
    #[error("no valid database connection")]
    NoConnection,

    /// A statement failed inside the driver.
    #[error("query failed: {source}")]
    Query {
        /// The statement that failed.
        sql: String,
        /// The underlying driver error.
        source: DriverError,
    },
}
