//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::ConnectionRegistry;
use crate::tools::query::{
    CountRowsInput, CountRowsOutput, QueryInput, QueryOutput, QueryToolHandler,
};
use crate::tools::schema::{
    ListDatabasesOutput, ListSchemasInput, ListSchemasOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct DbService {
    /// Named backends shared by every session
    registry: Arc<ConnectionRegistry>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DbService {
    #[tool(
        name = "query-select",
        description = "Execute a SELECT query and return all rows.\nOnly statements starting with SELECT are accepted.\nOmit `database` to use the first configured database."
    )]
    pub async fn query_select(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        QueryToolHandler::new(self.registry.clone())
            .query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "list-tables",
        description = "List the columns of every table in a schema (table, column, data type, position).\nDefaults: Oracle uses the current user's tables, MySQL the current database, others PUBLIC."
    )]
    pub async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        SchemaToolHandler::new(self.registry.clone())
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "count-rows",
        description = "Count rows in a table, optionally filtered by a WHERE clause.\n`tableName` may be schema-qualified (schema.table). `whereClause` is inserted as-is."
    )]
    pub async fn count_rows(
        &self,
        Parameters(input): Parameters<CountRowsInput>,
    ) -> Result<Json<CountRowsOutput>, McpError> {
        QueryToolHandler::new(self.registry.clone())
            .count_rows(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "list-databases",
        description = "List the logical names of all configured databases, in configuration order.\nUse these names as the `database` argument of the other tools."
    )]
    pub async fn list_databases(&self) -> Json<ListDatabasesOutput> {
        Json(SchemaToolHandler::new(self.registry.clone()).list_databases())
    }

    #[tool(
        name = "list-schemas",
        description = "List the schemas of a database (owners on Oracle)."
    )]
    pub async fn list_schemas(
        &self,
        Parameters(input): Parameters<ListSchemasInput>,
    ) -> Result<Json<ListSchemasOutput>, McpError> {
        SchemaToolHandler::new(self.registry.clone())
            .list_schemas(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "multi-db-mcp-server".to_owned(),
                title: Some("Multi DB MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for several named SQL databases.\n\
                \n\
                ## Workflow\n\
                1. Call `list-databases` to get the configured database names\n\
                2. Pass one of them as `database` to the other tools, or omit it to use the first\n\
                3. Use `list-schemas` and `list-tables` to explore, then `query-select` or `count-rows`\n\
                \n\
                ## Notes\n\
                - `query-select` only accepts statements starting with SELECT\n\
                - `count-rows` takes `tableName` (letters, digits, `_` and `.`) and an optional `whereClause`\n\
                - Schema names are upper-cased for Oracle"
                    .to_string(),
            ),
        }
    }
}
