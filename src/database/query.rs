//! Query execution and result handling.

use crate::database::types::{SqlValue, TypeMapper};
use crate::database::ConnectionPool;
use crate::error::AdvisorError;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// A single row of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    /// Column values indexed by column name.
    pub columns: HashMap<String, SqlValue>,
}

impl ResultRow {
    /// Create a new result row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Insert a value.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    /// Non-null string value of a column.
    pub fn string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            SqlValue::String(s) => Some(s.clone()),
            SqlValue::Null => None,
            other => Some(other.to_display_string()),
        }
    }

    pub fn i64(&self, column: &str) -> Option<i64> {
        self.get(column)?.as_i64()
    }

    /// Non-negative integer value of a column; negative values count as unknown.
    pub fn u32(&self, column: &str) -> Option<u32> {
        self.i64(column).and_then(|v| u32::try_from(v).ok())
    }

    pub fn i32(&self, column: &str) -> Option<i32> {
        self.i64(column).and_then(|v| i32::try_from(v).ok())
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column)?.as_f64()
    }

    pub fn bool(&self, column: &str) -> Option<bool> {
        self.get(column)?.as_bool()
    }
}

/// Result of a query execution.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Result rows.
    pub rows: Vec<ResultRow>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,

    /// Whether results were truncated due to row limit.
    pub truncated: bool,
}

/// Query executor for running the diagnostic queries.
pub struct QueryExecutor {
    pool: ConnectionPool,
    max_rows: usize,
}

impl QueryExecutor {
    /// Create a new query executor.
    pub fn new(pool: ConnectionPool, max_rows: usize) -> Self {
        Self { pool, max_rows }
    }

    /// The pool this executor draws connections from.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute a query and return its rows.
    pub async fn execute(&self, query: &str) -> Result<QueryResult, AdvisorError> {
        let start = Instant::now();

        debug!("Executing query: {}", truncate_for_log(query, 200));

        let mut conn = self.pool.get().await?;

        let stream = conn.query(query, &[]).await?;
        let rows: Vec<mssql_client::Row> = stream.try_collect().await?;

        let result = self.process_rows(rows, start);

        debug!(
            "Query completed: {} rows in {} ms",
            result.rows.len(),
            result.execution_time_ms
        );

        Ok(result)
    }

    /// Convert driver rows into name-indexed result rows.
    fn process_rows(&self, rows: Vec<mssql_client::Row>, start: Instant) -> QueryResult {
        let mut names: Vec<String> = Vec::new();
        let mut result_rows: Vec<ResultRow> = Vec::new();
        let mut truncated = false;

        for (idx, row) in rows.into_iter().enumerate() {
            if names.is_empty() {
                names = row.columns().iter().map(|col| col.name.clone()).collect();
            }

            if idx >= self.max_rows {
                truncated = true;
                break;
            }

            let mut result_row = ResultRow::new();
            for (col_idx, name) in names.iter().enumerate() {
                result_row.insert(name.clone(), TypeMapper::extract_column(&row, col_idx));
            }
            result_rows.push(result_row);
        }

        QueryResult {
            rows: result_rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
            truncated,
        }
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_row() {
        let mut row = ResultRow::new();
        row.insert("cpu_count", SqlValue::I32(16));
        row.insert("server_name", SqlValue::String("db01".to_string()));
        row.insert("max_dop", SqlValue::Null);

        assert_eq!(row.u32("cpu_count"), Some(16));
        assert_eq!(row.string("server_name").as_deref(), Some("db01"));
        assert_eq!(row.string("max_dop"), None);
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_negative_values_are_unknown_for_u32() {
        let mut row = ResultRow::new();
        row.insert("socket_count", SqlValue::I32(-1));
        assert_eq!(row.u32("socket_count"), None);
        assert_eq!(row.i32("socket_count"), Some(-1));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("this is a long string", 10), "this is a ...");
    }
}
