use std::sync::Arc;

use lazysql::{
    Database, DbConfig, GroupOptions, JoinOptions, NoopLogger, OrderBy, Row, SelectOptions, Where,
};
use serde_json::json;

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

async fn seeded_database(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("shop.db");
    let db = Database::sqlite();
    db.create_pool(
        DbConfig::new(path.to_str().expect("temp path should be utf-8"))
            .with_connection_limit(2)
            .with_logger(Arc::new(NoopLogger)),
    )
    .await
    .expect("failed to create pool");

    db.query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT)")
        .await
        .expect("failed to create users");
    db.query("CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, total INTEGER NOT NULL)")
        .await
        .expect("failed to create orders");
    db
}

#[tokio::test]
async fn insert_then_select_single() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = seeded_database(&dir).await;

    let inserted = db
        .insert("users", &row(json!({"name": "Ann", "city": "Oslo"})))
        .await
        .expect("failed to insert");
    assert_eq!(inserted.affected_rows, 1);
    assert_eq!(inserted.last_insert_id, Some(1));

    let ann = db
        .select_single("users", &SelectOptions::new().with_filter(Where::eq("name", "Ann")))
        .await
        .expect("failed to select")
        .expect("Ann should exist");
    assert_eq!(ann["id"], 1);
    assert_eq!(ann["city"], "Oslo");

    let nobody = db
        .select_single("users", &SelectOptions::new().with_filter(Where::eq("name", "Zed")))
        .await
        .expect("failed to select");
    assert!(nobody.is_none());
}

#[tokio::test]
async fn update_and_count() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = seeded_database(&dir).await;

    for name in ["Ann", "Bo", "Cy"] {
        db.insert("users", &row(json!({"name": name, "city": "Oslo"})))
            .await
            .expect("failed to insert");
    }
    assert_eq!(db.count("users", None).await.expect("failed to count"), 3);

    let updated = db
        .update(
            "users",
            &row(json!({"city": "Bergen"})),
            Some(&Where::raw("name <> 'Ann'")),
        )
        .await
        .expect("failed to update");
    assert_eq!(updated.affected_rows, 2);

    let in_bergen = db
        .count("users", Some(&Where::eq("city", "Bergen")))
        .await
        .expect("failed to count");
    assert_eq!(in_bergen, 2);

    let ordered = db
        .select(
            "users",
            &SelectOptions::new()
                .with_fields(["name"])
                .with_order(OrderBy::desc("name"))
                .with_limit(2),
        )
        .await
        .expect("failed to select");
    let names: Vec<_> = ordered.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("Cy"), json!("Bo")]);
}

#[tokio::test]
async fn grouped_and_joined_selects() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = seeded_database(&dir).await;

    db.insert("users", &row(json!({"id": 1, "name": "Ann", "city": "Oslo"})))
        .await
        .expect("failed to insert");
    db.insert("users", &row(json!({"id": 2, "name": "Bo", "city": "Oslo"})))
        .await
        .expect("failed to insert");
    db.insert("users", &row(json!({"id": 3, "name": "Cy", "city": "Rome"})))
        .await
        .expect("failed to insert");
    for (user_id, total) in [(1, 10), (1, 15), (2, 7)] {
        db.insert("orders", &row(json!({"user_id": user_id, "total": total})))
            .await
            .expect("failed to insert order");
    }

    let by_city = db
        .select_group(
            "users",
            &SelectOptions::new()
                .with_fields(["city", "COUNT(*) AS n"])
                .with_order(OrderBy::asc("city")),
            &GroupOptions::by(["city"]),
        )
        .await
        .expect("failed to group");
    assert_eq!(by_city.len(), 2);
    assert_eq!(by_city[0]["city"], "Oslo");
    assert_eq!(by_city[0]["n"], 2);

    let joined = db
        .select_join(
            "users",
            &JoinOptions::inner("orders", "orders.user_id = users.id"),
            &SelectOptions::new()
                .with_fields(["users.name", "orders.total"])
                .with_filter(Where::eq("users.name", "Ann")),
        )
        .await
        .expect("failed to join");
    assert_eq!(joined.len(), 2);

    let totals = db
        .select_join_group(
            "users",
            &JoinOptions::inner("orders", "orders.user_id = users.id"),
            &SelectOptions::new()
                .with_fields(["users.name", "SUM(orders.total) AS spent"])
                .with_order(OrderBy::asc("users.name")),
            &GroupOptions::by(["users.name"]).with_having(Where::raw("SUM(orders.total) > 10")),
        )
        .await
        .expect("failed to join and group");
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0]["name"], "Ann");
    assert_eq!(totals[0]["spent"], 25);

    let stats = db.manager().pool_stats().await.expect("pool should exist");
    assert_eq!(stats.active, 0, "every pooled handle should be released");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_through_a_small_pool() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = seeded_database(&dir).await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.insert("users", &row(json!({"name": format!("user-{i}")})))
                    .await?;
                db.count("users", None).await
            })
        })
        .collect();
    for handle in handles {
        handle
            .await
            .expect("task should not panic")
            .expect("concurrent query should succeed");
    }

    assert_eq!(db.count("users", None).await.expect("failed to count"), 8);
    let stats = db.manager().pool_stats().await.expect("pool should exist");
    assert_eq!(stats.active, 0);
    assert_eq!(stats.total, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_on_a_standalone_connection() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("solo.db");
    let db = Database::sqlite();
    db.manager()
        .get_connection(Some(
            DbConfig::new(path.to_str().expect("temp path should be utf-8"))
                .with_logger(Arc::new(NoopLogger)),
        ))
        .await
        .expect("failed to open standalone connection");
    db.query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .await
        .expect("failed to create table");

    for _ in 0..20 {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.query("SELECT count(*) AS n FROM t").await })
            })
            .collect();
        for handle in handles {
            let result = handle
                .await
                .expect("task should not panic")
                .expect("concurrent query should succeed");
            assert_eq!(result.rows[0]["n"], 0);
        }
    }

    assert!(db.manager().pool_stats().await.is_none());
}
