//! The query façade.

use std::sync::Arc;

use lazysql_db::{ConnectionManager, DbConfig, DbError, Dialect, QueryResult, Row, SqliteDriver};
use lazysql_query::{
    query_count, query_insert, query_select, query_select_group, query_select_join,
    query_select_join_group, query_update, GroupOptions, JoinOptions, SelectOptions, Where,
};
use serde_json::Value;

use crate::error::Error;

/// Runs SQL and CRUD helpers on connections from a [`ConnectionManager`].
///
/// Cloning is cheap; clones share the manager.
#[derive(Clone)]
pub struct Database {
    manager: Arc<ConnectionManager>,
    dialect: Dialect,
}

impl Database {
    /// A façade over `manager`, rendering SQL in its driver's dialect.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        let dialect = manager.driver().dialect();
        Self { manager, dialect }
    }

    /// A façade over a fresh manager using the bundled SQLite driver.
    pub fn sqlite() -> Self {
        Self::new(Arc::new(ConnectionManager::new(Arc::new(SqliteDriver::new()))))
    }

    /// The underlying connection manager.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// SQL dialect statements are rendered in.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Creates the connection pool (once) and caches `config`.
    ///
    /// # Errors
    ///
    /// See [`ConnectionManager::create_pool`].
    pub async fn create_pool(&self, config: DbConfig) -> Result<(), Error> {
        self.manager.create_pool(Some(config)).await?;
        Ok(())
    }

    /// Executes one statement on a connection from the manager.
    ///
    /// The connection is handed back through [`ConnectionManager::finish`]
    /// whether or not the statement succeeded: it is released, and ended once
    /// no concurrent query still holds it.
    ///
    /// # Errors
    ///
    /// Connection errors from the manager, `DbError::NoConnection` when the
    /// connection reports itself invalid, and `DbError::Query` when the
    /// driver rejects the statement.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        let conn = self.manager.acquire(None).await?;
        let logger = self.manager.logger().await;

        let outcome = if conn.is_valid().await {
            logger.debug(sql);
            conn.query(sql).await.map_err(|source| {
                logger.error(&format!("query failed: {source}; sql: {sql}"));
                DbError::Query {
                    sql: sql.to_string(),
                    source,
                }
            })
        } else {
            logger.error("no valid database connection");
            Err(DbError::NoConnection)
        };

        self.manager.finish(&conn).await;

        Ok(outcome?)
    }

    /// Rows of `SELECT` on `table`.
    ///
    /// # Errors
    ///
    /// `StatementError::MissingTableName` for an empty table, plus the
    /// errors of [`query`](Self::query).
    pub async fn select(&self, table: &str, options: &SelectOptions) -> Result<Vec<Row>, Error> {
        let sql = query_select(self.dialect, table, options)?;
        Ok(self.query(&sql).await?.rows)
    }

    /// The first row of `SELECT` on `table`, or `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub async fn select_single(
        &self,
        table: &str,
        options: &SelectOptions,
    ) -> Result<Option<Row>, Error> {
        Ok(self.select(table, options).await?.into_iter().next())
    }

    /// Rows of a grouped `SELECT` on `table`.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub async fn select_group(
        &self,
        table: &str,
        options: &SelectOptions,
        group: &GroupOptions,
    ) -> Result<Vec<Row>, Error> {
        let sql = query_select_group(self.dialect, table, options, group)?;
        Ok(self.query(&sql).await?.rows)
    }

    /// Rows of `SELECT` on `table` joined with another table.
    ///
    /// # Errors
    ///
    /// `StatementError::MissingTableName` when either table is empty, plus
    /// the errors of [`query`](Self::query).
    pub async fn select_join(
        &self,
        table: &str,
        join: &JoinOptions,
        options: &SelectOptions,
    ) -> Result<Vec<Row>, Error> {
        let sql = query_select_join(self.dialect, table, join, options)?;
        Ok(self.query(&sql).await?.rows)
    }

    /// Rows of a grouped, joined `SELECT` on `table`.
    ///
    /// # Errors
    ///
    /// Same as [`select_join`](Self::select_join).
    pub async fn select_join_group(
        &self,
        table: &str,
        join: &JoinOptions,
        options: &SelectOptions,
        group: &GroupOptions,
    ) -> Result<Vec<Row>, Error> {
        let sql = query_select_join_group(self.dialect, table, join, options, group)?;
        Ok(self.query(&sql).await?.rows)
    }

    /// Inserts one row.
    ///
    /// # Errors
    ///
    /// `StatementError::MissingTableName` or `StatementError::MissingValues`
    /// before anything is sent, plus the errors of [`query`](Self::query).
    pub async fn insert(&self, table: &str, values: &Row) -> Result<QueryResult, Error> {
        let sql = query_insert(self.dialect, table, values)?;
        self.query(&sql).await
    }

    /// Updates the rows matching `filter`.
    ///
    /// # Errors
    ///
    /// `StatementError::MissingTableName`, `StatementError::MissingValues` or
    /// `StatementError::MissingWhereClause` before anything is sent, plus the
    /// errors of [`query`](Self::query).
    pub async fn update(
        &self,
        table: &str,
        values: &Row,
        filter: Option<&Where>,
    ) -> Result<QueryResult, Error> {
        let sql = query_update(self.dialect, table, values, filter)?;
        self.query(&sql).await
    }

    /// Number of rows in `table` matching `filter`; `0` when the database
    /// returns no count.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub async fn count(&self, table: &str, filter: Option<&Where>) -> Result<i64, Error> {
        let sql = query_count(self.dialect, table, filter)?;
        let result = self.query(&sql).await?;
        Ok(result
            .first()
            .and_then(|row| row.get("count"))
            .and_then(count_value)
            .unwrap_or(0))
    }
}

/// Some drivers report aggregates as strings.
fn count_value(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
