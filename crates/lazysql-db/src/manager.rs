//! Lazy pool / connection lifecycle management.
//!
//! [`ConnectionManager`] owns the cached configuration, the logger, and at
//! most one active resource: either a pool or a standalone connection. Once a
//! pool exists, every connection is drawn from it.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::DbConfig;
use crate::driver::{Connection, Driver, Pool, PoolStats};
use crate::error::DbError;
use crate::logger::{QueryLogger, TracingLogger};

/// A standalone connection handed out by [`ConnectionManager::acquire`] and
/// not yet returned through [`ConnectionManager::finish`].
struct Lease {
    conn: Arc<dyn Connection>,
    holders: usize,
}

struct ManagerState {
    config: Option<DbConfig>,
    logger: Arc<dyn QueryLogger>,
    pool: Option<Arc<dyn Pool>>,
    standalone: Option<Arc<dyn Connection>>,
    leases: Vec<Lease>,
}

impl ManagerState {
    /// Picks the supplied configuration, falling back to the cached one, and
    /// caches the result together with its logger.
    fn resolve_config(&mut self, config: Option<DbConfig>) -> Result<DbConfig, DbError> {
        let config = match config {
            Some(config) => config,
            None => self.config.clone().ok_or(DbError::ConfigurationMissing)?,
        };
        config.validate()?;

        if let Some(logger) = &config.logger {
            self.logger = Arc::clone(logger);
        }
        self.config = Some(config.clone());
        Ok(config)
    }

    fn lease(&mut self, conn: &Arc<dyn Connection>) {
        match self.leases.iter_mut().find(|l| Arc::ptr_eq(&l.conn, conn)) {
            Some(lease) => lease.holders += 1,
            None => self.leases.push(Lease {
                conn: Arc::clone(conn),
                holders: 1,
            }),
        }
    }

    /// Drops one holder of `conn`. Returns `true` when the connection should
    /// now be ended: it was the last holder, or `conn` was never leased.
    fn unlease(&mut self, conn: &Arc<dyn Connection>) -> bool {
        let Some(idx) = self.leases.iter().position(|l| Arc::ptr_eq(&l.conn, conn)) else {
            return true;
        };
        self.leases[idx].holders -= 1;
        if self.leases[idx].holders > 0 {
            return false;
        }
        self.leases.swap_remove(idx);
        if self
            .standalone
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, conn))
        {
            self.standalone = None;
        }
        true
    }
}

/// Lazily creates and caches the database pool or standalone connection.
///
/// Construct one per application and share it by `Arc`. All create-if-absent
/// paths are serialized, so concurrent first callers never create more than
/// one pool or standalone connection.
pub struct ConnectionManager {
    driver: Arc<dyn Driver>,
    state: Mutex<ManagerState>,
}

impl ConnectionManager {
    /// A manager using `driver`, with nothing cached yet and the
    /// [`TracingLogger`].
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            state: Mutex::new(ManagerState {
                config: None,
                logger: Arc::new(TracingLogger),
                pool: None,
                standalone: None,
                leases: Vec::new(),
            }),
        }
    }

    /// The driver this manager creates resources with.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The current logger.
    pub async fn logger(&self) -> Arc<dyn QueryLogger> {
        Arc::clone(&self.state.lock().await.logger)
    }

    /// The cached configuration, if any call has supplied one.
    pub async fn config(&self) -> Option<DbConfig> {
        self.state.lock().await.config.clone()
    }

    /// Returns the pool, creating it on first use.
    ///
    /// An existing pool is returned unchanged and `config` is ignored.
    /// Otherwise `config` (or the cached configuration) is cached and used to
    /// build the pool.
    ///
    /// # Errors
    ///
    /// `DbError::ConfigurationMissing` when no configuration is available,
    /// `DbError::InvalidConfiguration` when it fails validation, and
    /// `DbError::PoolCreationFailed` when the driver cannot build the pool.
    pub async fn create_pool(&self, config: Option<DbConfig>) -> Result<Arc<dyn Pool>, DbError> {
        let mut state = self.state.lock().await;

        if let Some(pool) = &state.pool {
            log_pool_info(state.logger.as_ref(), pool.as_ref());
            return Ok(Arc::clone(pool));
        }

        let config = state.resolve_config(config)?;
        let pool = self
            .driver
            .create_pool(&config)
            .await
            .map_err(|err| {
                state.logger.error(&format!("failed to create connection pool: {err}"));
                DbError::PoolCreationFailed(err)
            })?;

        state.logger.info(&format!(
            "connection pool created: dialect={} connection_limit={}",
            self.driver.dialect(),
            config.connection_limit
        ));
        state.pool = Some(Arc::clone(&pool));
        // The pool supersedes any cached standalone connection.
        state.standalone = None;
        Ok(pool)
    }

    /// Returns a connection.
    ///
    /// With a pool, a fresh connection is borrowed from it; the caller owns
    /// that handle and returns it with [`Connection::release`]. Without a
    /// pool, the cached standalone connection is reused while it reports
    /// itself valid, and replaced otherwise.
    ///
    /// # Errors
    ///
    /// `DbError::ConfigurationMissing` when a standalone connection has to be
    /// opened and no configuration is available, `DbError::InvalidConfiguration`
    /// when it fails validation, and `DbError::ConnectionCreationFailed` when
    /// the driver or pool cannot supply a connection.
    pub async fn get_connection(
        &self,
        config: Option<DbConfig>,
    ) -> Result<Arc<dyn Connection>, DbError> {
        self.connect(config, false).await
    }

    /// Like [`get_connection`](Self::get_connection), but a standalone
    /// connection is leased: it stays open until every caller that acquired
    /// it has handed it back with [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Same as [`get_connection`](Self::get_connection).
    pub async fn acquire(&self, config: Option<DbConfig>) -> Result<Arc<dyn Connection>, DbError> {
        self.connect(config, true).await
    }

    /// Hands back a connection obtained from [`acquire`](Self::acquire).
    ///
    /// The connection is released, then ended unless it is a standalone
    /// connection still leased by another caller. The last holder ends it and
    /// drops it from the cache, so the next acquisition opens a new one.
    pub async fn finish(&self, conn: &Arc<dyn Connection>) {
        conn.release().await;
        let last = self.state.lock().await.unlease(conn);
        if last {
            conn.end().await;
        }
    }

    async fn connect(
        &self,
        config: Option<DbConfig>,
        lease: bool,
    ) -> Result<Arc<dyn Connection>, DbError> {
        let mut state = self.state.lock().await;

        if let Some(pool) = state.pool.clone() {
            let logger = Arc::clone(&state.logger);
            // Acquisition may wait for a free slot; do not hold the state lock.
            drop(state);

            let conn = pool.get_connection().await.map_err(|err| {
                logger.error(&format!("failed to acquire pooled connection: {err}"));
                DbError::ConnectionCreationFailed(err)
            })?;
            log_pool_info(logger.as_ref(), pool.as_ref());
            return Ok(conn);
        }

        let cached = match state.standalone.clone() {
            Some(conn) => {
                if conn.is_valid().await {
                    Some(conn)
                } else {
                    tracing::debug!("cached standalone connection is no longer valid, replacing it");
                    None
                }
            }
            None => None,
        };

        let conn = match cached {
            Some(conn) => conn,
            None => {
                let config = state.resolve_config(config)?;
                let conn = self
                    .driver
                    .create_connection(&config)
                    .await
                    .map_err(|err| {
                        state.logger.error(&format!("failed to create connection: {err}"));
                        DbError::ConnectionCreationFailed(err)
                    })?;
                state.standalone = Some(Arc::clone(&conn));
                conn
            }
        };

        if lease {
            state.lease(&conn);
        }
        Ok(conn)
    }

    /// Logs active, idle and total connection counts at info level. No-op
    /// without a pool.
    pub async fn pool_info(&self) {
        let state = self.state.lock().await;
        if let Some(pool) = &state.pool {
            log_pool_info(state.logger.as_ref(), pool.as_ref());
        }
    }

    /// Current pool counters, or `None` without a pool.
    pub async fn pool_stats(&self) -> Option<PoolStats> {
        self.state.lock().await.pool.as_ref().map(|pool| pool.stats())
    }
}

fn log_pool_info(logger: &dyn QueryLogger, pool: &dyn Pool) {
    let stats = pool.stats();
    logger.info(&format!(
        "pool connections: active={} idle={} total={}",
        stats.active, stats.idle, stats.total
    ));
}
