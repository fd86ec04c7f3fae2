//! SQL Server backend over tiberius.
//!
//! sqlx has no SQL Server driver, so this keeps a small pool of tiberius
//! clients bounded by the same [`PoolSizing`] as the sqlx pools. Connections
//! are opened on first use and returned to the idle list after each call.

use crate::config::{BackendSettings, PoolSizing};
use crate::db::pool::{RowSource, normalize_url};
use crate::db::types::{Row, RowToJson};
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use std::sync::Mutex;
use tiberius::{AuthMethod, Client, Config, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

type MssqlClient = Client<Compat<TcpStream>>;

/// Pool of tiberius clients for one backend.
pub struct MssqlPool {
    name: String,
    config: Config,
    sizing: PoolSizing,
    permits: Semaphore,
    idle: Mutex<Vec<MssqlClient>>,
}

impl std::fmt::Debug for MssqlPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlPool")
            .field("name", &self.name)
            .field("addr", &self.config.get_addr())
            .field("sizing", &self.sizing)
            .finish()
    }
}

impl MssqlPool {
    /// Parse the connection settings without opening a connection.
    pub fn connect_lazy(settings: &BackendSettings) -> DbResult<Self> {
        let config = mssql_config(settings)?;
        Ok(Self {
            name: settings.name.clone(),
            config,
            sizing: settings.pool,
            permits: Semaphore::new(settings.pool.max_connections as usize),
            idle: Mutex::new(Vec::new()),
        })
    }

    async fn open(&self) -> DbResult<MssqlClient> {
        let tcp = TcpStream::connect(self.config.get_addr())
            .await
            .map_err(tiberius::error::Error::from)?;
        tcp.set_nodelay(true)
            .map_err(tiberius::error::Error::from)?;
        let client = Client::connect(self.config.clone(), tcp.compat_write()).await?;
        debug!(database = %self.name, "Opened SQL Server connection");
        Ok(client)
    }

    fn checkout(&self) -> Option<MssqlClient> {
        self.idle.lock().ok()?.pop()
    }

    fn checkin(&self, client: MssqlClient) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.sizing.max_connections as usize {
                idle.push(client);
            }
        }
    }
}

#[async_trait]
impl RowSource for MssqlPool {
    async fn fetch_rows(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), database = %self.name, "Executing SQL Server query");

        let acquire = async {
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| DbError::Execution(sqlx::Error::PoolClosed))?;
            let client = match self.checkout() {
                Some(client) => client,
                None => self.open().await?,
            };
            Ok::<_, DbError>((permit, client))
        };
        let (_permit, mut client) = tokio::time::timeout(self.sizing.acquire_timeout, acquire)
            .await
            .map_err(|_| DbError::Execution(sqlx::Error::PoolTimedOut))??;

        let result = run(&mut client, sql, params).await;

        // Server-side errors leave the session usable; anything else drops it
        match &result {
            Ok(_) | Err(DbError::Mssql(tiberius::error::Error::Server(_))) => self.checkin(client),
            Err(_) => {}
        }
        result
    }

    async fn close(&self) {
        self.permits.close();
        let clients: Vec<MssqlClient> = match self.idle.lock() {
            Ok(mut idle) => idle.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for client in clients {
            if let Err(e) = client.close().await {
                debug!(database = %self.name, error = %e, "Error closing SQL Server connection");
            }
        }
    }
}

async fn run(client: &mut MssqlClient, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
    let rows = if params.is_empty() {
        client.simple_query(sql).await?.into_first_result().await?
    } else {
        let binds: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        client.query(sql, &binds).await?.into_first_result().await?
    };
    Ok(rows.iter().map(RowToJson::to_json_map).collect())
}

/// Build the tiberius config from a `jdbc:sqlserver://` or `mssql://` URL.
///
/// Backend `_USER`/`_PASSWORD` settings replace credentials in the URL.
fn mssql_config(settings: &BackendSettings) -> DbResult<Config> {
    let url = normalize_url(&settings.url);
    let lower = url.to_lowercase();
    let rest = ["sqlserver://", "mssql://"]
        .iter()
        .find(|scheme| lower.starts_with(**scheme))
        .map(|scheme| &url[scheme.len()..])
        .ok_or_else(|| {
            DbError::construction(
                &settings.name,
                format!("not a SQL Server URL: '{}'", settings.masked_url()),
            )
        })?;

    let mut config = Config::from_jdbc_string(&format!("jdbc:sqlserver://{}", rest)).map_err(|e| {
        DbError::construction(
            &settings.name,
            format!("invalid connection string '{}': {}", settings.masked_url(), e),
        )
    })?;
    if let Some(user) = settings.username.as_deref() {
        config.authentication(AuthMethod::sql_server(
            user,
            settings.password.as_deref().unwrap_or_default(),
        ));
    }
    config.application_name(settings.pool_name());
    Ok(config)
}
