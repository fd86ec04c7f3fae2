//! Read-only query execution.
//!
//! The read-only check is a syntactic prefix test: the trimmed statement must
//! start with `SELECT` (case-insensitive). It does not parse SQL, so a
//! `SELECT` that calls side-effecting functions passes. Treat it as a guard
//! against accidental writes, not as a security boundary.

use crate::db::registry::ConnectionHandle;
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use std::time::Instant;
use tracing::debug;

/// Keyword every accepted statement must start with.
const SELECT_PREFIX: &str = "SELECT";

/// Query executor for caller-supplied SELECT statements.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Reject anything that does not start with `SELECT`.
    pub fn validate_select(sql: &str) -> DbResult<()> {
        let normalized = sql.trim().to_uppercase();
        if normalized.starts_with(SELECT_PREFIX) {
            Ok(())
        } else {
            Err(DbError::invalid_input(
                "Only SELECT queries are allowed. Use a statement starting with SELECT.",
            ))
        }
    }

    /// Validate and run `sql`, returning every row in result order.
    pub async fn execute_query(handle: &ConnectionHandle, sql: &str) -> DbResult<Vec<Row>> {
        Self::validate_select(sql)?;

        let start = Instant::now();
        let rows = handle.fetch_rows(sql, &[]).await?;
        debug!(
            database = %handle.name(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(rows)
    }
}
