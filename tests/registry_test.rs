//! Integration tests for building the database registry from configuration.
//!
//! Tests verify that:
//! - Named backends are registered in configuration order with detected dialects
//! - Unconfigured and failing backends are skipped
//! - The host backend is used as "default" when nothing else is usable

mod common;

use common::{FakeConnector, RecordingSource, env, handle};
use multi_db_mcp::config::BackendSettings;
use multi_db_mcp::db::{ConnectionHandle, ConnectionRegistry, Dialect, PoolConnector};
use multi_db_mcp::error::DbError;

fn host_fallback() -> multi_db_mcp::error::DbResult<ConnectionHandle> {
    Ok(handle("host", Dialect::PostgreSql, RecordingSource::new()))
}

#[test]
fn test_named_backends_keep_configuration_order() {
    let connector = FakeConnector::default();
    let lookup = env(&[
        ("MCP_DB_ZETA_URL", "jdbc:oracle:thin:@db:1521/XE"),
        ("MCP_DB_ALPHA_URL", "jdbc:mysql://db:3306/app"),
        ("MCP_DB_MID_URL", "postgres://db/app"),
    ]);

    let registry =
        ConnectionRegistry::build("zeta, alpha ,mid", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
    assert_eq!(registry.resolve(Some("zeta")).unwrap().dialect(), Dialect::Oracle);
    assert_eq!(registry.resolve(Some("alpha")).unwrap().dialect(), Dialect::MySql);
    assert_eq!(
        registry.resolve(Some("mid")).unwrap().dialect(),
        Dialect::PostgreSql
    );
    // Omitted name resolves to the first configured backend
    assert_eq!(registry.resolve(None).unwrap().name(), "zeta");
}

#[test]
fn test_zero_names_registers_only_default() {
    let connector = FakeConnector::default();
    for names in ["", " ", ",,", " , "] {
        let registry =
            ConnectionRegistry::build(names, &connector, env(&[]), host_fallback).unwrap();
        assert_eq!(registry.names(), vec!["default"], "{names:?}");
        assert_eq!(
            registry.resolve(None).unwrap().dialect(),
            Dialect::PostgreSql
        );
    }
}

#[test]
fn test_all_names_without_url_fall_back_to_default() {
    let connector = FakeConnector::default();
    let lookup = env(&[("MCP_DB_B_URL", "   ")]);

    let registry = ConnectionRegistry::build("a,b", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["default"]);
}

#[test]
fn test_missing_url_is_skipped() {
    let connector = FakeConnector::default();
    let lookup = env(&[("MCP_DB_B_URL", "mysql://db/b")]);

    let registry = ConnectionRegistry::build("a,b", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["b"]);
}

#[test]
fn test_construction_failure_is_skipped() {
    let connector = FakeConnector::failing(&["broken"]);
    let lookup = env(&[
        ("MCP_DB_BROKEN_URL", "postgres://db/broken"),
        ("MCP_DB_OK_URL", "postgres://db/ok"),
    ]);

    let registry =
        ConnectionRegistry::build("broken,ok", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["ok"]);
    let err = registry.resolve(Some("broken")).unwrap_err();
    assert!(matches!(err, DbError::DatabaseNotFound { .. }));
}

#[test]
fn test_every_backend_failing_falls_back_to_default() {
    let connector = FakeConnector::failing(&["a"]);
    let lookup = env(&[("MCP_DB_A_URL", "postgres://db/a")]);

    let registry = ConnectionRegistry::build("a", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["default"]);
}

#[test]
fn test_duplicate_names_first_wins() {
    let connector = FakeConnector::default();
    let lookup = env(&[("MCP_DB_A_URL", "postgres://db/a")]);

    let registry = ConnectionRegistry::build("a,a,a", &connector, lookup, host_fallback).unwrap();

    assert_eq!(registry.names(), vec!["a"]);
}

#[test]
fn test_fallback_is_not_built_when_named_backends_exist() {
    let connector = FakeConnector::default();
    let lookup = env(&[("MCP_DB_A_URL", "postgres://db/a")]);

    let registry = ConnectionRegistry::build("a", &connector, lookup, || {
        panic!("default backend must not be built")
    })
    .unwrap();

    assert_eq!(registry.names(), vec!["a"]);
}

#[test]
fn test_fallback_error_is_propagated() {
    let connector = FakeConnector::default();
    let err = ConnectionRegistry::build("", &connector, env(&[]), || {
        Err(DbError::configuration("DATABASE_URL is not set"))
    })
    .unwrap_err();

    assert!(matches!(err, DbError::Configuration { .. }));
}

#[test]
fn test_from_config_uses_default_backend() {
    let connector = FakeConnector::default();
    let registry = ConnectionRegistry::from_config(
        None,
        Some(BackendSettings::host_default("jdbc:h2:mem:test")),
        &connector,
    )
    .unwrap();

    assert_eq!(registry.names(), vec!["default"]);
    assert_eq!(registry.resolve(None).unwrap().dialect(), Dialect::H2);
}

#[test]
fn test_from_config_without_any_database_fails() {
    let connector = FakeConnector::default();
    let err = ConnectionRegistry::from_config(Some(""), None, &connector).unwrap_err();
    assert!(matches!(err, DbError::Configuration { .. }));
}

#[test]
fn test_backend_settings_read_credentials_and_driver() {
    let lookup = env(&[
        ("MCP_DB_SALES_URL", " jdbc:mysql://db:3306/sales "),
        ("MCP_DB_SALES_DRIVER", "org.mariadb.jdbc.Driver"),
        ("MCP_DB_SALES_USER", "reader"),
        ("MCP_DB_SALES_PASSWORD", "s3cret"),
    ]);

    let settings = BackendSettings::from_env("sales", &lookup).unwrap();

    assert_eq!(settings.url, "jdbc:mysql://db:3306/sales");
    assert_eq!(settings.driver.as_deref(), Some("org.mariadb.jdbc.Driver"));
    assert_eq!(settings.username.as_deref(), Some("reader"));
    assert_eq!(settings.password.as_deref(), Some("s3cret"));
    assert_eq!(settings.pool_name(), "pool-sales");
    assert!(!format!("{:?}", settings).contains("s3cret"));
}

#[tokio::test]
async fn test_sql_server_backend_is_registered() {
    let lookup = env(&[
        ("MCP_DB_LEDGER_URL", "jdbc:sqlserver://127.0.0.1:1;databaseName=ledger"),
        ("MCP_DB_LEDGER_USER", "reader"),
        ("MCP_DB_H2_URL", "jdbc:h2:mem:test"),
    ]);

    let registry =
        ConnectionRegistry::build("ledger,h2", &PoolConnector, lookup, host_fallback).unwrap();

    // H2 has no driver and is skipped
    assert_eq!(registry.names(), vec!["ledger"]);
    assert_eq!(
        registry.resolve(None).unwrap().dialect(),
        Dialect::SqlServer
    );
    registry.close_all().await;
}

#[tokio::test]
async fn test_close_all_closes_every_source() {
    let a = RecordingSource::new();
    let b = RecordingSource::new();
    let registry = ConnectionRegistry::from_handles(vec![
        handle("a", Dialect::PostgreSql, a.clone()),
        handle("b", Dialect::MySql, b.clone()),
    ])
    .unwrap();

    registry.close_all().await;

    assert!(a.is_closed());
    assert!(b.is_closed());
}
