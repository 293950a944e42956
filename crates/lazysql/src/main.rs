//! lazysql binary: runs one SQL statement against the configured database
//! and prints the result as JSON lines.
//!
//! ```text
//! lazysql [--config PATH] <SQL>
//! ```

use std::process::ExitCode;

use lazysql::config;
use lazysql::Database;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: lazysql [--config PATH] <SQL>";

struct Args {
    config_path: Option<String>,
    sql: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config_path = None;
    let mut sql = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config requires a path")?;
                config_path = Some(path);
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            _ if sql.is_none() => sql = Some(arg),
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }

    let sql = sql
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| USAGE.to_string())?;
    Ok(Args { config_path, sql })
}

fn resolve_config_path(cli: Option<String>) -> Option<String> {
    cli.or_else(|| {
        std::env::var("LAZYSQL_CONFIG_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let config_path = resolve_config_path(args.config_path);
    let config = match config::load_config(config_path.as_deref().or(Some("lazysql.toml"))) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let db = Database::sqlite();
    if let Err(e) = db.create_pool(config.database).await {
        tracing::error!(error = %e, "failed to create connection pool");
        return ExitCode::FAILURE;
    }

    let result = match db.query(&args.sql).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "query failed");
            return ExitCode::FAILURE;
        }
    };

    if result.rows.is_empty() {
        tracing::info!(
            affected_rows = result.affected_rows,
            last_insert_id = ?result.last_insert_id,
            "statement executed"
        );
        println!("{}", serde_json::json!({ "affected_rows": result.affected_rows }));
    } else {
        for row in result.rows {
            println!("{}", Value::Object(row));
        }
    }

    ExitCode::SUCCESS
}
