//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: `query-select` and `count-rows`
//! - `schema`: `list-tables`, `list-schemas` and `list-databases`

pub mod query;
pub mod schema;

pub use query::{CountRowsInput, CountRowsOutput, QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    ListDatabasesOutput, ListSchemasInput, ListSchemasOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
