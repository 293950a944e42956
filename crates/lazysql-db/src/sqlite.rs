//! Bundled SQLite driver.
//!
//! Pools are built with `r2d2` over `r2d2_sqlite`; standalone connections
//! are plain `rusqlite` connections. Every connection runs in WAL mode with
//! foreign keys enabled and the configured busy timeout. All blocking calls
//! are moved onto tokio's blocking thread pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lazysql_query::{Dialect, Row};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::OpenFlags;
use serde_json::Value as JsonValue;

use crate::config::{DbConfig, SqliteSettings};
use crate::driver::{Connection, Driver, Pool, QueryResult};
use crate::error::DriverError;

type R2d2Pool = r2d2::Pool<SqliteConnectionManager>;

fn open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX
}

/// Applies WAL mode, foreign keys and the busy timeout to a fresh connection.
fn init_connection(conn: &rusqlite::Connection, settings: SqliteSettings) -> rusqlite::Result<()> {
    // In-memory databases report "memory", which is acceptable.
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!(
                "failed to set WAL journal mode, got: {}",
                journal_mode
            )),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {};",
        settings.busy_timeout_ms
    ))
}

fn build_pool(path: &str, settings: SqliteSettings, max_size: u32) -> Result<R2d2Pool, DriverError> {
    let manager = SqliteConnectionManager::file(path)
        .with_flags(open_flags())
        .with_init(move |conn| init_connection(conn, settings));

    let pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;
    Ok(pool)
}

fn json_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(text) => JsonValue::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
    }
}

/// Runs one statement, collecting rows for row-producing statements and the
/// change count otherwise.
fn run_statement(conn: &rusqlite::Connection, sql: &str) -> Result<QueryResult, DriverError> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let affected = stmt.execute([])?;
        // last_insert_rowid() is sticky across statements; only inserts report it.
        let is_insert = sql
            .trim_start()
            .get(..6)
            .is_some_and(|verb| verb.eq_ignore_ascii_case("insert"));
        let last_insert_id = Some(conn.last_insert_rowid()).filter(|id| is_insert && *id != 0);
        return Ok(QueryResult {
            rows: Vec::new(),
            affected_rows: affected as u64,
            last_insert_id,
        });
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), json_value(row.get_ref(idx)?));
        }
        records.push(record);
    }

    Ok(QueryResult::from_rows(records))
}

/// Access to the underlying `rusqlite` connection of a session slot.
trait AsSqlite: Send + 'static {
    fn sqlite(&self) -> &rusqlite::Connection;
}

impl AsSqlite for rusqlite::Connection {
    fn sqlite(&self) -> &rusqlite::Connection {
        self
    }
}

impl AsSqlite for PooledConnection<SqliteConnectionManager> {
    fn sqlite(&self) -> &rusqlite::Connection {
        self
    }
}

/// A session that can be taken out exactly once, when released or ended.
struct Slot<C> {
    conn: Arc<Mutex<Option<C>>>,
    open: AtomicBool,
}

impl<C: AsSqlite> Slot<C> {
    fn new(conn: C) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            open: AtomicBool::new(true),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn run(&self, sql: &str) -> Result<QueryResult, DriverError> {
        if !self.is_open() {
            return Err(DriverError::Closed);
        }
        let slot = Arc::clone(&self.conn);
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let guard = slot
                .lock()
                .map_err(|_| DriverError::Other("sqlite connection lock poisoned".to_string()))?;
            let conn = guard.as_ref().ok_or(DriverError::Closed)?;
            run_statement(conn.sqlite(), &sql)
        })
        .await?
    }

    /// Takes the session out and hands it to `finish`. Only the first call
    /// has an effect.
    async fn take<F>(&self, finish: F)
    where
        F: FnOnce(C) + Send + 'static,
    {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        let slot = Arc::clone(&self.conn);
        let joined = tokio::task::spawn_blocking(move || {
            let taken = slot.lock().ok().and_then(|mut guard| guard.take());
            if let Some(conn) = taken {
                finish(conn);
            }
        })
        .await;
        if let Err(err) = joined {
            tracing::warn!(error = %err, "failed to close sqlite session");
        }
    }
}

/// The SQLite [`Driver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Creates the driver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn create_pool(&self, config: &DbConfig) -> Result<Arc<dyn Pool>, DriverError> {
        let path = config.database.clone();
        let settings = config.sqlite;
        let max_size = config.connection_limit;

        let pool = tokio::task::spawn_blocking(move || build_pool(&path, settings, max_size)).await??;
        tracing::debug!(database = %config.database, max_size, "created sqlite pool");

        Ok(Arc::new(SqlitePool { inner: pool }))
    }

    async fn create_connection(
        &self,
        config: &DbConfig,
    ) -> Result<Arc<dyn Connection>, DriverError> {
        let path = config.database.clone();
        let settings = config.sqlite;

        let conn = tokio::task::spawn_blocking(move || -> Result<_, DriverError> {
            let conn = rusqlite::Connection::open_with_flags(&path, open_flags())?;
            init_connection(&conn, settings)?;
            Ok(conn)
        })
        .await??;
        tracing::debug!(database = %config.database, "opened standalone sqlite connection");

        Ok(Arc::new(SqliteConnection {
            slot: Slot::new(conn),
        }))
    }
}

/// An `r2d2` pool of SQLite connections.
pub struct SqlitePool {
    inner: R2d2Pool,
}

impl SqlitePool {
    /// Maximum number of connections the pool will open.
    pub fn max_size(&self) -> u32 {
        self.inner.max_size()
    }
}

#[async_trait]
impl Pool for SqlitePool {
    async fn get_connection(&self) -> Result<Arc<dyn Connection>, DriverError> {
        let pool = self.inner.clone();
        let conn = tokio::task::spawn_blocking(move || pool.get()).await??;
        Ok(Arc::new(SqlitePooledConnection {
            slot: Slot::new(conn),
        }))
    }

    fn active_connections(&self) -> usize {
        let state = self.inner.state();
        state.connections.saturating_sub(state.idle_connections) as usize
    }

    fn idle_connections(&self) -> usize {
        self.inner.state().idle_connections as usize
    }

    fn total_connections(&self) -> usize {
        self.inner.state().connections as usize
    }
}

/// A connection borrowed from a [`SqlitePool`]. `release` hands it back.
pub struct SqlitePooledConnection {
    slot: Slot<PooledConnection<SqliteConnectionManager>>,
}

#[async_trait]
impl Connection for SqlitePooledConnection {
    async fn query(&self, sql: &str) -> Result<QueryResult, DriverError> {
        self.slot.run(sql).await
    }

    async fn is_valid(&self) -> bool {
        self.slot.is_open()
    }

    async fn release(&self) {
        // Dropping the r2d2 handle returns it to the pool.
        self.slot.take(drop).await;
    }
}

/// A standalone SQLite connection. `end` closes it.
pub struct SqliteConnection {
    slot: Slot<rusqlite::Connection>,
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&self, sql: &str) -> Result<QueryResult, DriverError> {
        self.slot.run(sql).await
    }

    async fn is_valid(&self) -> bool {
        self.slot.is_open()
    }

    async fn end(&self) {
        self.slot
            .take(|conn| {
                if let Err((_, err)) = conn.close() {
                    tracing::warn!(error = %err, "failed to close sqlite connection");
                }
            })
            .await;
    }
}
