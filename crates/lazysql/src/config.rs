//! CLI configuration loading from file and environment variables.

use lazysql_db::DbConfig;
use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration of the `lazysql` binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Connection settings handed to the connection manager.
    #[serde(default)]
    pub database: DbConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lazysql=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `LAZYSQL_HOST` overrides `database.host`
/// - `LAZYSQL_PORT` overrides `database.port`
/// - `LAZYSQL_DATABASE` overrides `database.database`
/// - `LAZYSQL_USER` overrides `database.user`
/// - `LAZYSQL_PASSWORD` overrides `database.password`
/// - `LAZYSQL_CONNECTION_LIMIT` overrides `database.connection_limit`
/// - `LAZYSQL_COMPRESS` overrides `database.compress` (set to "true" to enable)
/// - `LAZYSQL_LOG_LEVEL` overrides `logging.level`
/// - `LAZYSQL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    let db = &mut config.database;
    if let Some(host) = var("LAZYSQL_HOST") {
        db.host = host;
    }
    if let Some(port) = var("LAZYSQL_PORT") {
        if let Ok(parsed) = port.parse() {
            db.port = parsed;
        }
    }
    if let Some(database) = var("LAZYSQL_DATABASE") {
        db.database = database;
    }
    if let Some(user) = var("LAZYSQL_USER") {
        db.user = user;
    }
    if let Some(password) = var("LAZYSQL_PASSWORD") {
        db.password = password;
    }
    if let Some(limit) = var("LAZYSQL_CONNECTION_LIMIT") {
        if let Ok(parsed) = limit.parse() {
            db.connection_limit = parsed;
        }
    }
    if let Some(compress) = var("LAZYSQL_COMPRESS") {
        db.compress = compress == "true" || compress == "1";
    }
    if let Some(level) = var("LAZYSQL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("LAZYSQL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
