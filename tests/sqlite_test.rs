//! Integration tests against a real SQLite database through sqlx pools.
//!
//! Tests verify that:
//! - Backends configured by name are reachable through the tools
//! - Row values keep their column order and JSON types
//! - Backend failures surface as execution errors

mod common;

use common::env;
use multi_db_mcp::db::{ConnectionRegistry, Dialect, PoolConnector};
use multi_db_mcp::error::DbError;
use multi_db_mcp::tools::query::{CountRowsInput, QueryInput, QueryToolHandler};
use multi_db_mcp::tools::schema::{ListTablesInput, SchemaToolHandler};
use serde_json::{Value as JsonValue, json};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Create a SQLite file with a small `users` table and return its path.
async fn setup_db() -> String {
    let temp_file = NamedTempFile::new().unwrap();
    // Keep the file around after the handle is dropped
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO users (id, name, age) VALUES (1, 'Ada', 36), (2, 'Linus', 28), (3, 'Grace', 85)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    db_path
}

async fn setup_registry() -> Arc<ConnectionRegistry> {
    let db_path = setup_db().await;
    let url = format!("sqlite:{}", db_path);
    let lookup = env(&[("MCP_DB_LOCAL_URL", url.as_str())]);
    let registry = ConnectionRegistry::build("local", &PoolConnector, lookup, || {
        panic!("default backend must not be built")
    })
    .unwrap();
    Arc::new(registry)
}

fn as_count(value: &JsonValue) -> i64 {
    match value {
        JsonValue::Number(n) => n.as_i64().unwrap(),
        JsonValue::String(s) => s.parse().unwrap(),
        other => panic!("not a count: {other}"),
    }
}

#[tokio::test]
async fn test_query_select_returns_ordered_rows() {
    let registry = setup_registry().await;
    assert_eq!(registry.resolve(None).unwrap().dialect(), Dialect::Unknown);
    let handler = QueryToolHandler::new(registry.clone());

    let out = handler
        .query(QueryInput {
            query: "SELECT name, id FROM users ORDER BY id".into(),
            database: Some("local".into()),
        })
        .await
        .unwrap();

    assert_eq!(out.database, "local");
    assert_eq!(out.row_count, 3);
    let first = &out.rows[0];
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "id"]);
    assert_eq!(first["name"], json!("Ada"));
    assert_eq!(first["id"], json!(1));

    registry.close_all().await;
}

#[tokio::test]
async fn test_count_rows_with_and_without_filter() {
    let registry = setup_registry().await;
    let handler = QueryToolHandler::new(registry.clone());

    let all = handler
        .count_rows(CountRowsInput {
            table_name: "users".into(),
            where_clause: None,
            database: None,
        })
        .await
        .unwrap();
    assert_eq!(as_count(&all.total), 3);

    let filtered = handler
        .count_rows(CountRowsInput {
            table_name: "users".into(),
            where_clause: Some("age > 30".into()),
            database: None,
        })
        .await
        .unwrap();
    assert_eq!(as_count(&filtered.total), 2);

    registry.close_all().await;
}

#[tokio::test]
async fn test_backend_errors_are_execution_errors() {
    let registry = setup_registry().await;
    let handler = QueryToolHandler::new(registry.clone());

    let err = handler
        .query(QueryInput {
            query: "SELECT * FROM missing_table".into(),
            database: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(_)));

    let err = handler
        .count_rows(CountRowsInput {
            table_name: "users".into(),
            where_clause: Some("no_such_column = 1".into()),
            database: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(_)));

    registry.close_all().await;
}

#[tokio::test]
async fn test_list_tables_on_sqlite_fails_without_information_schema() {
    let registry = setup_registry().await;
    let handler = SchemaToolHandler::new(registry.clone());

    let err = handler
        .list_tables(ListTablesInput {
            database: None,
            schema: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution(_)));

    registry.close_all().await;
}
