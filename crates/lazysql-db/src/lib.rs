//! Connection lifecycle layer for lazysql.
//!
//! Lazily creates and caches either a connection pool or a single standalone
//! connection, and hands out connection handles to the query façade. The
//! database itself is reached through the [`Driver`] trait; a SQLite driver
//! backed by `r2d2` and `rusqlite` is bundled.
//!
//! # Design decisions
//!
//! - **Explicit context object**: all cached state (configuration, logger,
//!   pool, standalone connection) lives in a [`ConnectionManager`] that the
//!   caller constructs and shares, so independent instances never interfere.
//! - **Single-flight initialization**: the create-if-absent paths run under
//!   one async mutex, so concurrent first callers produce exactly one pool or
//!   one standalone connection.
//! - **Owned pooled handles**: every acquisition from the pool yields its own
//!   handle; only standalone connections are cached and reused.

mod config;
mod driver;
mod error;
mod logger;
mod manager;
mod sqlite;

pub use config::{DbConfig, SqliteSettings};
pub use driver::{Connection, Driver, Pool, PoolStats, QueryResult};
pub use error::{DbError, DriverError};
pub use lazysql_query::{Dialect, Row};
pub use logger::{NoopLogger, QueryLogger, TracingLogger};
pub use manager::ConnectionManager;
pub use sqlite::{SqliteConnection, SqliteDriver, SqlitePool, SqlitePooledConnection};
