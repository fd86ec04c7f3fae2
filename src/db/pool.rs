//! Connection pool construction and query execution.
//!
//! Pools are database-specific (MySqlPool, PgPool, SqlitePool) to keep full
//! type support. SQL Server and Oracle have no sqlx driver and get their own
//! pools in [`crate::db::mssql`] and `crate::db::oracle`. The rest of the
//! crate only sees them through [`RowSource`].

use crate::config::BackendSettings;
use crate::db::mssql::MssqlPool;
#[cfg(feature = "oracle")]
use crate::db::oracle::OraclePool;
use crate::db::types::{Row, RowToJson};
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::{
    Executor, MySqlPool, PgPool, SqlitePool,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    postgres::{PgConnectOptions, PgPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Anything that can run a statement and hand back its rows.
///
/// Implementations must be safe for concurrent use; callers add no locking.
#[async_trait]
pub trait RowSource: Send + Sync + std::fmt::Debug {
    /// Run `sql` with positional string parameters and collect every row.
    async fn fetch_rows(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>>;

    /// Release the underlying connections.
    async fn close(&self);
}

/// Builds a [`RowSource`] for one configured backend.
pub trait Connector {
    fn connect(&self, settings: &BackendSettings) -> DbResult<Arc<dyn RowSource>>;
}

/// Driver used to talk to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    Postgres,
    /// Includes MariaDB
    MySql,
    SQLite,
    /// tiberius
    SqlServer,
    /// ODPI-C, behind the `oracle` feature
    Oracle,
}

impl DbDriver {
    /// Parse an explicit driver setting. JDBC class names are accepted.
    pub fn from_name(driver: &str) -> Option<Self> {
        let lower = driver.trim().to_lowercase();
        if lower.contains("postgres") {
            Some(Self::Postgres)
        } else if lower.contains("mysql") || lower.contains("mariadb") {
            Some(Self::MySql)
        } else if lower.contains("sqlite") {
            Some(Self::SQLite)
        } else if lower.contains("sqlserver") || lower.contains("mssql") {
            Some(Self::SqlServer)
        } else if lower.contains("oracle") {
            Some(Self::Oracle)
        } else {
            None
        }
    }

    /// Pick the driver from a normalized connection URL's scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else if lower.starts_with("sqlserver://") || lower.starts_with("mssql://") {
            Some(Self::SqlServer)
        } else if lower.starts_with("oracle:") {
            Some(Self::Oracle)
        } else {
            None
        }
    }

    /// Resolve the driver for a backend: explicit setting first, then URL.
    pub fn resolve(settings: &BackendSettings) -> DbResult<Self> {
        if let Some(driver) = settings.driver.as_deref() {
            return Self::from_name(driver).ok_or_else(|| {
                DbError::construction(
                    &settings.name,
                    format!("unsupported driver '{}'", driver),
                )
            });
        }

        Self::from_url(&normalize_url(&settings.url)).ok_or_else(|| {
            DbError::construction(
                &settings.name,
                format!(
                    "no driver available for '{}' (supported: postgres, mysql/mariadb, sqlite, sqlserver, oracle)",
                    settings.masked_url()
                ),
            )
        })
    }
}

/// Strip a leading `jdbc:` and map `mariadb:` onto the MySQL driver scheme.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_jdbc = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("jdbc:") => &trimmed[5..],
        _ => trimmed,
    };
    match without_jdbc.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mariadb:") => {
            format!("mysql:{}", &without_jdbc[8..])
        }
        _ => without_jdbc.to_string(),
    }
}

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Create a lazily-connecting pool for the given backend.
    ///
    /// Only the URL and options are validated here; the first connection is
    /// opened on first use. Must be called from within a Tokio runtime.
    pub fn connect_lazy(settings: &BackendSettings) -> DbResult<Self> {
        let driver = DbDriver::resolve(settings)?;
        let url = normalize_url(&settings.url);
        let sizing = settings.pool;
        let invalid = |e: sqlx::Error| {
            DbError::construction(
                &settings.name,
                format!("invalid connection string '{}': {}", settings.masked_url(), e),
            )
        };

        let pool = match driver {
            DbDriver::Postgres => {
                let mut options = PgConnectOptions::from_str(&url).map_err(invalid)?;
                if let Some(user) = settings.username.as_deref() {
                    options = options.username(user);
                }
                if let Some(password) = settings.password.as_deref() {
                    options = options.password(password);
                }
                DbPool::Postgres(
                    PgPoolOptions::new()
                        .max_connections(sizing.max_connections)
                        .min_connections(sizing.min_connections)
                        .acquire_timeout(sizing.acquire_timeout)
                        .connect_lazy_with(options),
                )
            }
            DbDriver::MySql => {
                let mut options = MySqlConnectOptions::from_str(&url)
                    .map_err(invalid)?
                    .charset("utf8mb4");
                if let Some(user) = settings.username.as_deref() {
                    options = options.username(user);
                }
                if let Some(password) = settings.password.as_deref() {
                    options = options.password(password);
                }
                DbPool::MySql(
                    MySqlPoolOptions::new()
                        .max_connections(sizing.max_connections)
                        .min_connections(sizing.min_connections)
                        .acquire_timeout(sizing.acquire_timeout)
                        .connect_lazy_with(options),
                )
            }
            DbDriver::SQLite => {
                let options = SqliteConnectOptions::from_str(&url).map_err(invalid)?;
                DbPool::SQLite(
                    SqlitePoolOptions::new()
                        .max_connections(sizing.max_connections)
                        .min_connections(sizing.min_connections)
                        .acquire_timeout(sizing.acquire_timeout)
                        .connect_lazy_with(options),
                )
            }
            DbDriver::SqlServer | DbDriver::Oracle => {
                return Err(DbError::construction(
                    &settings.name,
                    format!("{:?} is not served by sqlx", driver),
                ));
            }
        };

        Ok(pool)
    }

    /// Get the driver for this pool.
    pub fn driver(&self) -> DbDriver {
        match self {
            DbPool::MySql(_) => DbDriver::MySql,
            DbPool::Postgres(_) => DbDriver::Postgres,
            DbPool::SQLite(_) => DbDriver::SQLite,
        }
    }
}

#[async_trait]
impl RowSource for DbPool {
    async fn fetch_rows(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), driver = ?self.driver(), "Executing query");

        // Without parameters run the raw SQL to avoid prepared statement issues
        let rows = match self {
            DbPool::MySql(p) => {
                let rows = if params.is_empty() {
                    p.fetch(sql).try_collect::<Vec<_>>().await?
                } else {
                    bind_all(sqlx::query(sql), params).fetch_all(p).await?
                };
                rows.iter().map(RowToJson::to_json_map).collect()
            }
            DbPool::Postgres(p) => {
                let rows = if params.is_empty() {
                    p.fetch(sql).try_collect::<Vec<_>>().await?
                } else {
                    bind_all(sqlx::query(sql), params).fetch_all(p).await?
                };
                rows.iter().map(RowToJson::to_json_map).collect()
            }
            DbPool::SQLite(p) => {
                let rows = if params.is_empty() {
                    p.fetch(sql).try_collect::<Vec<_>>().await?
                } else {
                    bind_all(sqlx::query(sql), params).fetch_all(p).await?
                };
                rows.iter().map(RowToJson::to_json_map).collect()
            }
        };

        Ok(rows)
    }

    async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }
}

/// Bind every parameter as text.
fn bind_all<'q, DB>(
    mut query: sqlx::query::Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>,
    params: &'q [String],
) -> sqlx::query::Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>
where
    DB: sqlx::Database,
    &'q str: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    for param in params {
        query = query.bind(param.as_str());
    }
    query
}

/// Connector backed by real driver pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolConnector;

impl Connector for PoolConnector {
    fn connect(&self, settings: &BackendSettings) -> DbResult<Arc<dyn RowSource>> {
        match DbDriver::resolve(settings)? {
            DbDriver::SqlServer => Ok(Arc::new(MssqlPool::connect_lazy(settings)?)),
            #[cfg(feature = "oracle")]
            DbDriver::Oracle => Ok(Arc::new(OraclePool::connect(settings)?)),
            #[cfg(not(feature = "oracle"))]
            DbDriver::Oracle => Err(DbError::construction(
                &settings.name,
                "Oracle support is not compiled in (enable the `oracle` feature)",
            )),
            DbDriver::Postgres | DbDriver::MySql | DbDriver::SQLite => {
                Ok(Arc::new(DbPool::connect_lazy(settings)?))
            }
        }
    }
}
