//! MCP Streamable HTTP on axum.
//!
//! Each session gets its own [`DbService`] over the shared registry.

use crate::db::ConnectionRegistry;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Time open SSE streams get to finish after the first shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    registry: Arc<ConnectionRegistry>,
    host: String,
    port: u16,
    /// Path the MCP service is mounted on; `/` serves every path
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(addr = %bind_addr, databases = ?self.registry.names(), "Serving on HTTP");

        let registry = self.registry.clone();
        let service = StreamableHttpService::new(
            move || Ok(DbService::new(registry.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects the root path
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::configuration(format!("cannot bind {}: {}", bind_addr, e))
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let stopping = Arc::new(tokio::sync::Notify::new());
        let notify = stopping.clone();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            wait_for_signal().await;
            notify.notify_one();
        });

        // SSE streams can keep the server alive, so shutdown is bounded
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server failed");
                        self.registry.close_all().await;
                        return Err(DbError::internal(format!("HTTP server failed: {}", e)));
                    }
                }
            }
            _ = async {
                stopping.notified().await;
                info!(timeout_secs = GRACEFUL_TIMEOUT.as_secs(), "Draining sessions");
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => warn!("Sessions still open, stopping anyway"),
                    _ = wait_for_signal() => warn!("Second signal, stopping now"),
                }
            } => {}
        }

        self.registry.close_all().await;
        info!(databases = self.registry.len(), "Closed database pools");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
