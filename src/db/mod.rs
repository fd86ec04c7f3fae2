//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Dialect detection from connection URLs
//! - Connection pools behind the `RowSource` seam (sqlx, tiberius, oracle)
//! - The named backend registry
//! - Schema introspection, read-only queries and row counting
//! - Type mappings from driver rows to JSON

pub mod counter;
pub mod dialect;
pub mod executor;
pub mod mssql;
#[cfg(feature = "oracle")]
pub mod oracle;
pub mod pool;
pub mod registry;
pub mod schema;
pub mod types;

pub use counter::RowCounter;
pub use dialect::Dialect;
pub use executor::QueryExecutor;
pub use pool::{Connector, DbDriver, DbPool, RowSource, PoolConnector};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use schema::{SchemaIntrospector, SchemaRow, Statement, TableColumnRow};
pub use types::Row;
