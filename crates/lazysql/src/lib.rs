//! lazysql: CRUD helpers over a lazily created connection pool.
//!
//! [`Database`] turns structured parameters into SQL through
//! `lazysql-query` and runs it on a connection supplied by a
//! [`ConnectionManager`]. The manager creates a pool or a standalone
//! connection on first use and caches the configuration, so only the first
//! call needs one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lazysql::{Database, DbConfig, SelectOptions, Where};
//! use serde_json::json;
//!
//! let db = Database::sqlite();
//! db.create_pool(DbConfig::new("app.db")).await?;
//! db.insert("users", json!({"name": "Ann"}).as_object().unwrap()).await?;
//! let ann = db
//!     .select_single("users", &SelectOptions::new().with_filter(Where::eq("name", "Ann")))
//!     .await?;
//! ```

pub mod config;
mod database;
mod error;

pub use database::Database;
pub use error::Error;
pub use lazysql_db::{
    Connection, ConnectionManager, DbConfig, DbError, Dialect, Driver, DriverError, NoopLogger,
    Pool, PoolStats, QueryLogger, QueryResult, Row, SqliteDriver, TracingLogger,
};
pub use lazysql_query::{
    GroupOptions, JoinKind, JoinOptions, OrderBy, SelectOptions, StatementError, Where,
};
