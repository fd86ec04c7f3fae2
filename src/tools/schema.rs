//! Schema introspection tools.
//!
//! This module implements the `list-tables`, `list-schemas` and
//! `list-databases` MCP tools.

use crate::db::{ConnectionRegistry, Dialect, SchemaIntrospector, SchemaRow, TableColumnRow};
use crate::error::DbResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the list-tables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Logical database name from list-databases. Omit to use the first configured database.
    #[serde(default)]
    pub database: Option<String>,
    /// Schema (Oracle: owner) to list. Defaults to the current user (Oracle),
    /// the current database (MySQL) or PUBLIC (others).
    #[serde(default)]
    pub schema: Option<String>,
}

/// Output from the list-tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub database: String,
    pub dialect: Dialect,
    /// One entry per column, ordered by table then column position
    pub columns: Vec<TableColumnRow>,
    pub count: usize,
}

/// Input for the list-schemas tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListSchemasInput {
    /// Logical database name from list-databases. Omit to use the first configured database.
    #[serde(default)]
    pub database: Option<String>,
}

/// Output from the list-schemas tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListSchemasOutput {
    pub database: String,
    pub dialect: Dialect,
    pub schemas: Vec<SchemaRow>,
    pub count: usize,
}

/// Output for the list-databases tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    /// Logical database names in configuration order
    pub databases: Vec<String>,
    pub count: usize,
}

pub struct SchemaToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl SchemaToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let handle = self.registry.resolve(input.database.as_deref())?;
        let columns = SchemaIntrospector::list_tables(handle, input.schema.as_deref()).await?;
        let count = columns.len();

        info!(
            database = %handle.name(),
            dialect = %handle.dialect(),
            schema = ?input.schema,
            count = count,
            "Listed tables"
        );

        Ok(ListTablesOutput {
            database: handle.name().to_string(),
            dialect: handle.dialect(),
            columns,
            count,
        })
    }

    pub async fn list_schemas(&self, input: ListSchemasInput) -> DbResult<ListSchemasOutput> {
        let handle = self.registry.resolve(input.database.as_deref())?;
        let schemas = SchemaIntrospector::list_schemas(handle).await?;
        let count = schemas.len();

        info!(
            database = %handle.name(),
            dialect = %handle.dialect(),
            count = count,
            "Listed schemas"
        );

        Ok(ListSchemasOutput {
            database: handle.name().to_string(),
            dialect: handle.dialect(),
            schemas,
            count,
        })
    }

    /// Registered logical names; never touches a backend.
    pub fn list_databases(&self) -> ListDatabasesOutput {
        let databases = self.registry.names();
        let count = databases.len();
        ListDatabasesOutput { databases, count }
    }
}
