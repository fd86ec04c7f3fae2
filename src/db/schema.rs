//! Schema introspection.
//!
//! The same logical request ("list tables", "list schemas") is turned into a
//! dialect-specific statement, executed, and mapped onto fixed row shapes.
//!
//! # Architecture
//!
//! SQL templates live in the `queries` submodule. Statement building is pure
//! (`*_statement` functions) so the dispatch can be checked without a server;
//! execution goes through the handle's pool.

use crate::db::dialect::Dialect;
use crate::db::registry::ConnectionHandle;
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Schema used for ANSI backends when none is given.
pub const DEFAULT_ANSI_SCHEMA: &str = "PUBLIC";

/// One column of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TableColumnRow {
    pub table_name: String,
    pub column_name: String,
    /// Null when the backend reports no type (Oracle allows this)
    pub data_type: Option<String>,
    /// 1-based position of the column within its table
    pub ordinal_position: i64,
}

/// One schema (or Oracle owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SchemaRow {
    pub schema_name: String,
}

/// A statement with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn with_param(sql: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: vec![param.into()],
        }
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod oracle {
        pub const COLUMNS_SELECT: &str =
            "SELECT table_name, column_name, data_type, column_id AS ordinal_position";

        pub const LIST_OWNERS: &str =
            "SELECT DISTINCT owner AS schema_name FROM all_tables ORDER BY owner";
    }

    pub mod ansi {
        pub const COLUMNS_SELECT: &str =
            "SELECT table_name, column_name, data_type, ordinal_position FROM information_schema.columns";

        pub const LIST_SCHEMAS: &str =
            "SELECT schema_name FROM information_schema.schemata ORDER BY schema_name";
    }
}

/// Schema introspector for database metadata.
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Build the column listing statement for `dialect`.
    ///
    /// A blank `schema` is treated as omitted.
    pub fn list_tables_statement(dialect: Dialect, schema: Option<&str>) -> Statement {
        let schema = schema.map(str::trim).filter(|s| !s.is_empty());

        match dialect {
            Dialect::Oracle => match schema {
                Some(owner) => Statement::with_param(
                    format!(
                        "{} FROM all_tab_columns WHERE owner = {} ORDER BY table_name, column_id",
                        queries::oracle::COLUMNS_SELECT,
                        dialect.placeholder(1)
                    ),
                    owner.to_uppercase(),
                ),
                // Current user's own tables
                None => Statement::new(format!(
                    "{} FROM user_tab_columns ORDER BY table_name, column_id",
                    queries::oracle::COLUMNS_SELECT
                )),
            },
            Dialect::MySql => match schema {
                Some(schema) => Statement::with_param(
                    format!(
                        "{} WHERE table_schema = {} ORDER BY table_name, ordinal_position",
                        queries::ansi::COLUMNS_SELECT,
                        dialect.placeholder(1)
                    ),
                    schema,
                ),
                None => Statement::new(format!(
                    "{} WHERE table_schema = DATABASE() ORDER BY table_name, ordinal_position",
                    queries::ansi::COLUMNS_SELECT
                )),
            },
            Dialect::H2 | Dialect::PostgreSql | Dialect::SqlServer | Dialect::Unknown => {
                Statement::with_param(
                    format!(
                        "{} WHERE table_schema = {} ORDER BY table_name, ordinal_position",
                        queries::ansi::COLUMNS_SELECT,
                        dialect.placeholder(1)
                    ),
                    schema.unwrap_or(DEFAULT_ANSI_SCHEMA),
                )
            }
        }
    }

    /// Build the schema listing statement for `dialect`.
    pub fn list_schemas_statement(dialect: Dialect) -> Statement {
        match dialect {
            Dialect::Oracle => Statement::new(queries::oracle::LIST_OWNERS),
            Dialect::MySql
            | Dialect::H2
            | Dialect::PostgreSql
            | Dialect::SqlServer
            | Dialect::Unknown => Statement::new(queries::ansi::LIST_SCHEMAS),
        }
    }

    /// List every column of every table visible in `schema`.
    pub async fn list_tables(
        handle: &ConnectionHandle,
        schema: Option<&str>,
    ) -> DbResult<Vec<TableColumnRow>> {
        let statement = Self::list_tables_statement(handle.dialect(), schema);
        debug!(
            database = %handle.name(),
            dialect = %handle.dialect(),
            sql = %statement.sql,
            "Listing tables"
        );

        handle
            .fetch_rows(&statement.sql, &statement.params)
            .await?
            .iter()
            .map(TableColumnRow::from_row)
            .collect()
    }

    /// List the schemas (owners on Oracle) of a backend.
    pub async fn list_schemas(handle: &ConnectionHandle) -> DbResult<Vec<SchemaRow>> {
        let statement = Self::list_schemas_statement(handle.dialect());
        debug!(
            database = %handle.name(),
            dialect = %handle.dialect(),
            sql = %statement.sql,
            "Listing schemas"
        );

        handle
            .fetch_rows(&statement.sql, &statement.params)
            .await?
            .iter()
            .map(SchemaRow::from_row)
            .collect()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================
//
// Oracle and MySQL report upper-case column labels, so lookups ignore case.

fn field<'r>(row: &'r Row, name: &str) -> DbResult<&'r JsonValue> {
    row.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
        .ok_or_else(|| DbError::introspection(format!("metadata row has no '{}' column", name)))
}

fn nullable_text_field(row: &Row, name: &str) -> DbResult<Option<String>> {
    Ok(match field(row, name)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    })
}

fn text_field(row: &Row, name: &str) -> DbResult<String> {
    nullable_text_field(row, name)?
        .ok_or_else(|| DbError::introspection(format!("metadata column '{}' is null", name)))
}

fn integer_field(row: &Row, name: &str) -> DbResult<i64> {
    let value = field(row, name)?;
    let parsed = match value {
        JsonValue::Number(n) => n.as_i64(),
        // Oracle NUMBER columns decode as exact decimal strings
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DbError::introspection(format!(
            "metadata column '{}' is not an integer: {}",
            name, value
        ))
    })
}

impl TableColumnRow {
    /// Map a raw introspection row onto the fixed column shape.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            table_name: text_field(row, "table_name")?,
            column_name: text_field(row, "column_name")?,
            data_type: nullable_text_field(row, "data_type")?,
            ordinal_position: integer_field(row, "ordinal_position")?,
        })
    }
}

impl SchemaRow {
    pub fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            schema_name: text_field(row, "schema_name")?,
        })
    }
}
