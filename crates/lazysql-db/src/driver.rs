//! Driver traits: the boundary between lazysql and a concrete database
//! client.
//!
//! - [`Driver`]: creates pools and standalone connections from a config
//! - [`Pool`]: hands out connections and reports its occupancy
//! - [`Connection`]: executes statements and can be released or ended

use std::sync::Arc;

use async_trait::async_trait;
use lazysql_query::{Dialect, Row};

use crate::config::DbConfig;
use crate::error::DriverError;

/// Outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Rows returned by a row-producing statement.
    pub rows: Vec<Row>,
    /// Rows changed by a data-modifying statement.
    pub affected_rows: u64,
    /// Identifier generated by the last insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    /// A result carrying only rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// Occupancy counters of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently handed out.
    pub active: usize,
    /// Connections open and waiting in the pool.
    pub idle: usize,
    /// All open connections.
    pub total: usize,
}

/// A live database session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes one statement.
    async fn query(&self, sql: &str) -> Result<QueryResult, DriverError>;

    /// Whether the session can still run statements.
    async fn is_valid(&self) -> bool;

    /// Returns a pooled session to its pool. No-op for standalone sessions.
    async fn release(&self) {}

    /// Closes a standalone session. No-op for pooled sessions.
    async fn end(&self) {}
}

/// A driver-managed set of reusable connections.
#[async_trait]
pub trait Pool: Send + Sync {
    /// Borrows a connection; may wait until a slot frees up, per the pool's
    /// own policy.
    async fn get_connection(&self) -> Result<Arc<dyn Connection>, DriverError>;

    /// Connections currently handed out.
    fn active_connections(&self) -> usize;

    /// Connections open and idle.
    fn idle_connections(&self) -> usize;

    /// All open connections.
    fn total_connections(&self) -> usize;

    /// Snapshot of the three counters.
    fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.active_connections(),
            idle: self.idle_connections(),
            total: self.total_connections(),
        }
    }
}

/// Factory for pools and standalone connections.
#[async_trait]
pub trait Driver: Send + Sync {
    /// SQL flavour spoken by this driver.
    fn dialect(&self) -> Dialect;

    /// Builds a connection pool.
    async fn create_pool(&self, config: &DbConfig) -> Result<Arc<dyn Pool>, DriverError>;

    /// Opens a standalone connection.
    async fn create_connection(&self, config: &DbConfig)
        -> Result<Arc<dyn Connection>, DriverError>;
}
