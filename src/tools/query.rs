//! Query and row count tools.
//!
//! This module implements the `query-select` and `count-rows` MCP tools.
//! Both only read: `query-select` rejects statements that do not start with
//! `SELECT`, and `count-rows` only builds `COUNT(*)` statements.

use crate::db::{ConnectionRegistry, QueryExecutor, Row, RowCounter};
use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Input for the query-select tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL SELECT statement to execute. Anything not starting with SELECT is rejected.
    pub query: String,
    /// Logical database name from list-databases. Omit to use the first configured database.
    #[serde(default)]
    pub database: Option<String>,
}

/// Output from the query-select tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Database the query ran against
    pub database: String,
    /// Result rows as column-to-value maps, in result order
    pub rows: Vec<Row>,
    /// Number of rows returned
    pub row_count: usize,
}

/// Input for the count-rows tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountRowsInput {
    /// Table to count, optionally schema-qualified (e.g. `sales.orders`)
    pub table_name: String,
    /// Optional filter appended as `WHERE <whereClause>`. Passed through unvalidated.
    #[serde(default)]
    pub where_clause: Option<String>,
    /// Logical database name from list-databases. Omit to use the first configured database.
    #[serde(default)]
    pub database: Option<String>,
}

/// Output from the count-rows tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CountRowsOutput {
    /// Database the count ran against
    pub database: String,
    /// Number of matching rows as reported by the backend
    pub total: JsonValue,
}

impl CountRowsOutput {
    /// Pull the `total` column out of a count row, ignoring label case.
    pub fn from_row(database: impl Into<String>, row: Row) -> DbResult<Self> {
        let total = row
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("total"))
            .map(|(_, value)| value)
            .ok_or_else(|| DbError::internal("count query result has no 'total' column"))?;
        Ok(Self {
            database: database.into(),
            total,
        })
    }
}

/// Handler for query-select and count-rows.
pub struct QueryToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl QueryToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handle the query-select tool call.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        // Reject before resolving so bad input never touches a pool
        QueryExecutor::validate_select(&input.query)?;

        let handle = self.registry.resolve(input.database.as_deref())?;
        let rows = QueryExecutor::execute_query(handle, &input.query).await?;
        let row_count = rows.len();

        info!(
            database = %handle.name(),
            dialect = %handle.dialect(),
            row_count = row_count,
            "Query executed"
        );

        Ok(QueryOutput {
            database: handle.name().to_string(),
            rows,
            row_count,
        })
    }

    /// Handle the count-rows tool call.
    pub async fn count_rows(&self, input: CountRowsInput) -> DbResult<CountRowsOutput> {
        RowCounter::validate_table_name(&input.table_name)?;

        let handle = self.registry.resolve(input.database.as_deref())?;
        let row =
            RowCounter::count_rows(handle, &input.table_name, input.where_clause.as_deref())
                .await?;
        let output = CountRowsOutput::from_row(handle.name(), row)?;

        info!(
            database = %handle.name(),
            table = %input.table_name,
            total = %output.total,
            "Counted rows"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_rows_input_uses_camel_case() {
        let input: CountRowsInput = serde_json::from_value(json!({
            "tableName": "orders",
            "whereClause": "id > 5",
            "database": "sales"
        }))
        .unwrap();
        assert_eq!(input.table_name, "orders");
        assert_eq!(input.where_clause.as_deref(), Some("id > 5"));
        assert_eq!(input.database.as_deref(), Some("sales"));
    }

    #[test]
    fn test_query_input_optional_database() {
        let input: QueryInput = serde_json::from_value(json!({ "query": "SELECT 1" })).unwrap();
        assert!(input.database.is_none());
    }

    #[test]
    fn test_count_output_reads_total_any_case() {
        let row = json!({ "TOTAL": 42 }).as_object().cloned().unwrap();
        let output = CountRowsOutput::from_row("a", row).unwrap();
        assert_eq!(output.total, json!(42));
        assert_eq!(output.database, "a");
    }

    #[test]
    fn test_count_output_missing_total() {
        let row = json!({ "count": 1 }).as_object().cloned().unwrap();
        assert!(CountRowsOutput::from_row("a", row).is_err());
    }
}
