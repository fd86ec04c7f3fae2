//! Multi DB MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query several named SQL databases (PostgreSQL, MySQL/MariaDB,
//! SQLite) through one server, with dialect-aware schema introspection that
//! also covers Oracle, H2 and SQL Server.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::ConnectionRegistry;
pub use error::DbError;
pub use mcp::DbService;
