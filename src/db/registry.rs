//! Named registry of backend connection handles.
//!
//! The registry is built once at startup and is read-only afterwards, so it is
//! shared behind an `Arc` without any locking. Insertion order is kept: an
//! omitted database name resolves to the first registered backend.

use crate::config::{BackendSettings, DEFAULT_DATABASE_NAME, parse_db_names};
use crate::db::dialect::Dialect;
use crate::db::pool::{Connector, RowSource};
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One named backend: a pooled row source and the dialect it speaks.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    name: String,
    dialect: Dialect,
    source: Arc<dyn RowSource>,
}

impl ConnectionHandle {
    pub fn new(name: impl Into<String>, dialect: Dialect, source: Arc<dyn RowSource>) -> Self {
        Self {
            name: name.into(),
            dialect,
            source,
        }
    }

    /// Build a handle from backend settings, detecting the dialect from its URL.
    pub fn connect<C: Connector + ?Sized>(
        connector: &C,
        settings: &BackendSettings,
    ) -> DbResult<Self> {
        let source = connector.connect(settings)?;
        Ok(Self::new(
            settings.name.clone(),
            Dialect::detect(&settings.url),
            source,
        ))
    }

    /// Logical name of this backend.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run a statement against this backend's pool.
    pub async fn fetch_rows(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
        self.source.fetch_rows(sql, params).await
    }

    async fn close(&self) {
        self.source.close().await;
    }
}

/// Insertion-ordered mapping from logical name to [`ConnectionHandle`].
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    handles: Vec<ConnectionHandle>,
    index: HashMap<String, usize>,
}

impl ConnectionRegistry {
    /// Build a registry from already constructed handles.
    ///
    /// Fails when no handle is given or a name is empty or repeated.
    pub fn from_handles(handles: impl IntoIterator<Item = ConnectionHandle>) -> DbResult<Self> {
        let mut registry = Self::default();
        for handle in handles {
            if handle.name().trim().is_empty() {
                return Err(DbError::configuration("database name cannot be empty"));
            }
            if registry.contains(handle.name()) {
                return Err(DbError::configuration(format!(
                    "database '{}' is registered twice",
                    handle.name()
                )));
            }
            registry.insert(handle);
        }
        if registry.is_empty() {
            return Err(DbError::configuration("no database handles supplied"));
        }
        Ok(registry)
    }

    /// Build the registry from a comma-separated list of logical names.
    ///
    /// Each name is configured through `lookup` (`MCP_DB_<NAME>_URL`, ...).
    /// Names without a URL and backends that fail to build are logged and
    /// skipped. When nothing usable remains, the handle produced by `fallback`
    /// is registered under `"default"`.
    pub fn build<C, L, F>(names: &str, connector: &C, lookup: L, fallback: F) -> DbResult<Self>
    where
        C: Connector + ?Sized,
        L: Fn(&str) -> Option<String>,
        F: FnOnce() -> DbResult<ConnectionHandle>,
    {
        let names = parse_db_names(names);
        let mut registry = Self::default();

        if names.is_empty() {
            registry.insert_fallback(fallback)?;
            info!(
                database = DEFAULT_DATABASE_NAME,
                "Single database mode, registered default backend"
            );
            return Ok(registry);
        }

        for name in &names {
            if registry.contains(name) {
                warn!(database = %name, "Database listed more than once, ignoring duplicate");
                continue;
            }

            let Some(settings) = BackendSettings::from_env(name, &lookup) else {
                warn!(
                    database = %name,
                    variable = %BackendSettings::env_key(name, "URL"),
                    "Database skipped, URL not set"
                );
                continue;
            };

            match ConnectionHandle::connect(connector, &settings) {
                Ok(handle) => {
                    info!(
                        database = %name,
                        dialect = %handle.dialect(),
                        pool = %settings.pool_name(),
                        url = %settings.masked_url(),
                        "Database registered"
                    );
                    registry.insert(handle);
                }
                Err(e) => {
                    error!(
                        database = %name,
                        pool = %settings.pool_name(),
                        error = %e,
                        "Failed to create database pool, skipping"
                    );
                }
            }
        }

        if registry.is_empty() {
            warn!(
                configured = names.len(),
                "No valid database configured, falling back to default backend"
            );
            registry.insert_fallback(fallback)?;
        }

        Ok(registry)
    }

    /// Build the registry from process configuration and environment.
    pub fn from_config<C: Connector + ?Sized>(
        names: Option<&str>,
        default_backend: Option<BackendSettings>,
        connector: &C,
    ) -> DbResult<Self> {
        Self::build(
            names.unwrap_or_default(),
            connector,
            |key| std::env::var(key).ok(),
            || {
                let settings = default_backend.ok_or_else(|| {
                    DbError::configuration(
                        "no usable database: set MCP_DB_NAMES with MCP_DB_<NAME>_URL, or DATABASE_URL",
                    )
                })?;
                ConnectionHandle::connect(connector, &settings)
            },
        )
    }

    /// Resolve a handle by logical name.
    ///
    /// An omitted or blank name resolves to the first registered backend.
    pub fn resolve(&self, name: Option<&str>) -> DbResult<&ConnectionHandle> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => self
                .handles
                .first()
                .ok_or_else(|| DbError::database_not_found("", self.names())),
            Some(name) => self
                .index
                .get(name)
                .map(|&idx| &self.handles[idx])
                .ok_or_else(|| DbError::database_not_found(name, self.names())),
        }
    }

    /// Registered logical names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Close every pool. The registry stays usable only for listing names.
    pub async fn close_all(&self) {
        for handle in &self.handles {
            info!(database = %handle.name, "Closing connection pool");
            handle.close().await;
        }
        info!("All connection pools closed");
    }

    fn insert(&mut self, handle: ConnectionHandle) {
        self.index.insert(handle.name.clone(), self.handles.len());
        self.handles.push(handle);
    }

    fn insert_fallback<F>(&mut self, fallback: F) -> DbResult<()>
    where
        F: FnOnce() -> DbResult<ConnectionHandle>,
    {
        let handle = fallback()?;
        // The host backend is always addressed as "default"
        self.insert(ConnectionHandle {
            name: DEFAULT_DATABASE_NAME.to_string(),
            ..handle
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NullSource;

    #[async_trait]
    impl RowSource for NullSource {
        async fn fetch_rows(&self, _sql: &str, _params: &[String]) -> DbResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn close(&self) {}
    }

    fn handle(name: &str) -> ConnectionHandle {
        ConnectionHandle::new(name, Dialect::Unknown, Arc::new(NullSource))
    }

    #[test]
    fn test_resolve_first_when_omitted() {
        let registry =
            ConnectionRegistry::from_handles(vec![handle("x"), handle("y"), handle("z")]).unwrap();
        assert_eq!(registry.resolve(None).unwrap().name(), "x");
        assert_eq!(registry.resolve(Some("")).unwrap().name(), "x");
        assert_eq!(registry.resolve(Some("  ")).unwrap().name(), "x");
        assert_eq!(registry.resolve(Some("z")).unwrap().name(), "z");
    }

    #[test]
    fn test_resolve_missing_lists_names() {
        let registry = ConnectionRegistry::from_handles(vec![handle("a"), handle("b")]).unwrap();
        let err = registry.resolve(Some("missing")).unwrap_err();
        assert!(matches!(err, DbError::DatabaseNotFound { .. }));
        let msg = err.to_string();
        assert!(msg.contains("missing"));
        assert!(msg.contains('a') && msg.contains('b'));
    }

    #[test]
    fn test_from_handles_rejects_duplicates_and_empty() {
        assert!(ConnectionRegistry::from_handles(Vec::new()).is_err());
        assert!(ConnectionRegistry::from_handles(vec![handle("a"), handle("a")]).is_err());
        assert!(ConnectionRegistry::from_handles(vec![handle(" ")]).is_err());
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let registry =
            ConnectionRegistry::from_handles(vec![handle("zeta"), handle("alpha"), handle("mid")])
                .unwrap();
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_fallback_handle_is_renamed_default() {
        let mut registry = ConnectionRegistry::default();
        registry.insert_fallback(|| Ok(handle("host"))).unwrap();
        assert_eq!(registry.names(), vec![DEFAULT_DATABASE_NAME]);
    }
}
