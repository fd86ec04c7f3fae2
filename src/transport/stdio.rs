//! JSON-RPC over stdin/stdout. Logs must stay on stderr.

use crate::db::ConnectionRegistry;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StdioTransport {
    registry: Arc<ConnectionRegistry>,
}

impl StdioTransport {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!(databases = ?self.registry.names(), "Serving on stdio");

        let service = DbService::new(self.registry.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("stdio handshake failed: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(reason) => info!(?reason, "Client disconnected"),
                    Err(e) => {
                        warn!(error = %e, "stdio session failed");
                        self.registry.close_all().await;
                        return Err(DbError::internal(format!("stdio session failed: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutting down; a second signal exits immediately");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Second signal, exiting");
                std::process::exit(1);
            });
        }

        self.registry.close_all().await;
        info!(databases = self.registry.len(), "Closed database pools");

        if shutdown_requested {
            // The stdin reader blocks and cannot be cancelled
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
