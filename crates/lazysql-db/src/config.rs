//! Connection configuration.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::DbError;
use crate::logger::QueryLogger;

/// Settings for reaching a database and sizing its pool.
///
/// Supplied once to the [`ConnectionManager`](crate::ConnectionManager) and
/// cached there for every later call that omits it. For the bundled SQLite
/// driver `database` is the path of the database file.
#[derive(Clone, Deserialize)]
pub struct DbConfig {
    /// Database server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Database server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name (file path for SQLite).
    #[serde(default)]
    pub database: String,

    /// Login user.
    #[serde(default)]
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,

    /// Ask the driver to compress traffic.
    #[serde(default)]
    pub compress: bool,

    /// SQLite runtime tunables.
    #[serde(default)]
    pub sqlite: SqliteSettings,

    /// Logger used by the manager and the query façade. `None` keeps the
    /// manager's current logger.
    #[serde(skip)]
    pub logger: Option<Arc<dyn QueryLogger>>,
}

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SqliteSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_connection_limit() -> u32 {
    10
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            connection_limit: default_connection_limit(),
            compress: false,
            sqlite: SqliteSettings::default(),
            logger: None,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("connection_limit", &self.connection_limit)
            .field("compress", &self.compress)
            .field("sqlite", &self.sqlite)
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl DbConfig {
    /// Configuration for the given database with every other field at its
    /// default.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Sets host and port.
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Sets the login credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Sets the pool size limit.
    pub fn with_connection_limit(mut self, limit: u32) -> Self {
        self.connection_limit = limit;
        self
    }

    /// Enables or disables compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Sets the logger.
    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Checks the fields the drivers rely on.
    ///
    /// # Errors
    ///
    /// Returns `DbError::InvalidConfiguration` for a zero connection limit or
    /// an empty database name.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.connection_limit == 0 {
            return Err(DbError::InvalidConfiguration(
                "connection_limit must be at least 1".to_string(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(DbError::InvalidConfiguration(
                "database must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
