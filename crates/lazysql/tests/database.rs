use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lazysql::{
    Connection, ConnectionManager, Database, DbConfig, DbError, Dialect, Driver, DriverError,
    Error, NoopLogger, Pool, QueryResult, Row, SelectOptions, StatementError, Where,
};
use serde_json::json;

/// Shared record of what the fake database saw.
#[derive(Default)]
struct Recorder {
    executed: Mutex<Vec<String>>,
    connections: AtomicUsize,
    releases: AtomicUsize,
    ends: AtomicUsize,
}

impl Recorder {
    fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("recorder lock").clone()
    }
}

struct FakeConnection {
    recorder: Arc<Recorder>,
    valid: bool,
    closed: AtomicBool,
    fail: bool,
    rows: Vec<Row>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn query(&self, sql: &str) -> Result<QueryResult, DriverError> {
        // Long enough for concurrent callers to overlap on one connection.
        tokio::time::sleep(Duration::from_millis(2)).await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        self.recorder
            .executed
            .lock()
            .expect("recorder lock")
            .push(sql.to_string());
        if self.fail {
            return Err(DriverError::Other("syntax error".into()));
        }
        Ok(QueryResult {
            rows: self.rows.clone(),
            affected_rows: 1,
            last_insert_id: None,
        })
    }

    async fn is_valid(&self) -> bool {
        self.valid && !self.closed.load(Ordering::SeqCst)
    }

    async fn release(&self) {
        self.recorder.releases.fetch_add(1, Ordering::SeqCst);
    }

    async fn end(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.recorder.ends.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeDriver {
    recorder: Arc<Recorder>,
    valid: AtomicBool,
    fail: bool,
    rows: Vec<Row>,
}

impl FakeDriver {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
            valid: AtomicBool::new(true),
            fail: false,
            rows,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    async fn create_pool(&self, _config: &DbConfig) -> Result<Arc<dyn Pool>, DriverError> {
        Err(DriverError::Other("pooling not supported by fake".into()))
    }

    async fn create_connection(
        &self,
        _config: &DbConfig,
    ) -> Result<Arc<dyn Connection>, DriverError> {
        self.recorder.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeConnection {
            recorder: Arc::clone(&self.recorder),
            valid: self.valid.load(Ordering::SeqCst),
            closed: AtomicBool::new(false),
            fail: self.fail,
            rows: self.rows.clone(),
        }))
    }
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

async fn database(driver: FakeDriver) -> (Database, Arc<Recorder>) {
    let recorder = Arc::clone(&driver.recorder);
    let manager = Arc::new(ConnectionManager::new(Arc::new(driver)));
    let config = DbConfig::new("app").with_logger(Arc::new(NoopLogger));
    manager
        .get_connection(Some(config))
        .await
        .expect("fake driver should connect");
    (Database::new(manager), recorder)
}

#[tokio::test]
async fn select_sends_the_rendered_statement() {
    let (db, recorder) = database(FakeDriver::new(vec![row(json!({"id": 5, "name": "Ann"}))])).await;
    assert_eq!(db.dialect(), Dialect::Mysql);

    let options = SelectOptions::new()
        .with_fields(["id", "name"])
        .with_filter(Where::eq("id", 5));
    let rows = db.select("users", &options).await.expect("select should succeed");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Ann");
    let expected =
        lazysql_query::query_select(Dialect::Mysql, "users", &options).expect("valid select");
    assert_eq!(recorder.executed(), vec![expected]);
}

#[tokio::test]
async fn statement_errors_never_reach_the_driver() {
    let (db, recorder) = database(FakeDriver::new(Vec::new())).await;

    let err = db.insert("users", &Row::new()).await.expect_err("empty insert");
    assert!(matches!(err, Error::Statement(StatementError::MissingValues)));

    let err = db
        .select("", &SelectOptions::new())
        .await
        .expect_err("missing table");
    assert!(matches!(err, Error::Statement(StatementError::MissingTableName)));

    let err = db
        .update("users", &row(json!({"name": "Bo"})), None)
        .await
        .expect_err("update without filter");
    assert!(matches!(err, Error::Statement(StatementError::MissingWhereClause)));

    assert!(recorder.executed().is_empty());
    assert_eq!(recorder.releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connection_is_cleaned_up_once_after_success() {
    let (db, recorder) = database(FakeDriver::new(Vec::new())).await;

    let result = db
        .insert("users", &row(json!({"name": "Ann"})))
        .await
        .expect("insert should succeed");

    assert_eq!(result.affected_rows, 1);
    assert_eq!(recorder.releases.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_is_cleaned_up_once_after_failure() {
    let (db, recorder) = database(FakeDriver::failing()).await;

    let err = db.query("SELEC 1").await.expect_err("driver rejects statement");
    match err {
        Error::Db(DbError::Query { sql, .. }) => assert_eq!(sql, "SELEC 1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(recorder.releases.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_connection_reports_no_connection() {
    let driver = FakeDriver::new(Vec::new());
    driver.valid.store(false, Ordering::SeqCst);
    let recorder = Arc::clone(&driver.recorder);
    let manager = Arc::new(ConnectionManager::new(Arc::new(driver)));
    let db = Database::new(Arc::clone(&manager));

    // Seed the configuration; every connection the fake hands out is invalid.
    let config = DbConfig::new("app").with_logger(Arc::new(NoopLogger));
    manager
        .get_connection(Some(config))
        .await
        .expect("fake driver should connect");

    let err = db.query("SELECT 1").await.expect_err("connection is invalid");
    assert!(matches!(err, Error::Db(DbError::NoConnection)), "unexpected error: {err:?}");
    assert!(recorder.executed().is_empty());
    assert_eq!(recorder.releases.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_without_configuration_fails() {
    let db = Database::new(Arc::new(ConnectionManager::new(Arc::new(FakeDriver::new(
        Vec::new(),
    )))));

    let err = db.query("SELECT 1").await.expect_err("nothing configured");
    assert!(matches!(err, Error::Db(DbError::ConfigurationMissing)));
}

#[tokio::test]
async fn select_single_returns_none_for_no_rows() {
    let (db, _) = database(FakeDriver::new(Vec::new())).await;

    let found = db
        .select_single("users", &SelectOptions::new().with_filter(Where::eq("id", 9)))
        .await
        .expect("select should succeed");
    assert!(found.is_none());
}

#[tokio::test]
async fn count_reads_the_count_column() {
    let (db, recorder) = database(FakeDriver::new(vec![row(json!({"count": 3}))])).await;
    let n = db
        .count("users", Some(&Where::eq("active", true)))
        .await
        .expect("count should succeed");
    assert_eq!(n, 3);
    assert!(recorder.executed()[0].starts_with("SELECT COUNT(*)"));

    let (db, _) = database(FakeDriver::new(vec![row(json!({"count": "12"}))])).await;
    assert_eq!(db.count("users", None).await.expect("count"), 12);

    let (db, _) = database(FakeDriver::new(vec![row(json!({"count": 0}))])).await;
    assert_eq!(db.count("users", None).await.expect("count"), 0);

    let (db, _) = database(FakeDriver::new(Vec::new())).await;
    assert_eq!(db.count("users", None).await.expect("count"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_share_the_standalone_connection() {
    let (db, recorder) = database(FakeDriver::new(vec![row(json!({"n": 1}))])).await;

    for _ in 0..20 {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.query("SELECT 1 AS n").await })
            })
            .collect();
        for handle in handles {
            let result = handle
                .await
                .expect("task should not panic")
                .expect("concurrent query should succeed");
            assert_eq!(result.rows.len(), 1);
        }
    }

    assert_eq!(recorder.executed().len(), 160);
    assert_eq!(recorder.releases.load(Ordering::SeqCst), 160);
    // Each connection is ended exactly once, by its last holder.
    assert_eq!(
        recorder.ends.load(Ordering::SeqCst),
        recorder.connections.load(Ordering::SeqCst)
    );
}
