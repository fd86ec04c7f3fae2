//! Table row counting.
//!
//! Only the table name is validated. The optional `WHERE` fragment is appended
//! verbatim, so callers must treat that argument as trusted input.

use crate::db::registry::ConnectionHandle;
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Identifier start followed by identifier characters; dots allowed for `schema.table`.
static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.]*$").expect("table name pattern is valid")
});

/// Row counter for a single table.
pub struct RowCounter;

impl RowCounter {
    pub fn validate_table_name(table_name: &str) -> DbResult<()> {
        if TABLE_NAME.is_match(table_name) {
            Ok(())
        } else {
            Err(DbError::invalid_input(format!(
                "Invalid table name '{}': expected letters, digits, '_' or '.', not starting with a digit",
                table_name
            )))
        }
    }

    /// Build `SELECT COUNT(*) as total FROM <table>[ WHERE <clause>]`.
    pub fn build_count_query(table_name: &str, where_clause: Option<&str>) -> DbResult<String> {
        Self::validate_table_name(table_name)?;

        let mut sql = format!("SELECT COUNT(*) as total FROM {}", table_name);
        if let Some(clause) = where_clause.filter(|c| !c.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        Ok(sql)
    }

    /// Count rows of `table_name`, optionally filtered by `where_clause`.
    ///
    /// Returns the single result row, which carries a `total` field.
    pub async fn count_rows(
        handle: &ConnectionHandle,
        table_name: &str,
        where_clause: Option<&str>,
    ) -> DbResult<Row> {
        let sql = Self::build_count_query(table_name, where_clause)?;
        debug!(database = %handle.name(), sql = %sql, "Counting rows");

        handle
            .fetch_rows(&sql, &[])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::internal("count query returned no rows"))
    }
}
