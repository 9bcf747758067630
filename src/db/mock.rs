//! Mock database client for testing.
//!
//! Provides an in-memory implementation with a canned schema, an
//! order-preserving log of executed statements, and scriptable per-pattern
//! failures to exercise the repair path without a live database.

use super::{Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Schema, Table, Value};
use crate::error::{Result, SqlwrightError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    /// (pattern, message): statements containing `pattern` fail with `message`.
    failures: Vec<(String, String)>,
    /// Statements seen by `execute_statement`, in order.
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock client with a small sample schema.
    pub fn new() -> Self {
        Self {
            schema: sample_schema(),
            ..Self::default()
        }
    }

    /// Creates a new mock client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Makes statements containing `pattern` fail with `message`.
    pub fn fail_matching(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((pattern.into(), message.into()));
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.lock().expect("executed lock poisoned").clone()
    }
}

/// The schema handed out by `MockDatabaseClient::new`.
fn sample_schema() -> Schema {
    Schema {
        tables: vec![
            Table {
                name: "users".to_string(),
                columns: vec![
                    Column::new("id", "integer").nullable(false),
                    Column::new("email", "varchar(255)").nullable(false),
                    Column::new("name", "varchar(100)"),
                ],
                primary_key: vec!["id".to_string()],
            },
            Table {
                name: "orders".to_string(),
                columns: vec![
                    Column::new("id", "integer").nullable(false),
                    Column::new("user_id", "integer").nullable(false),
                    Column::new("total", "numeric(10,2)").nullable(false),
                ],
                primary_key: vec!["id".to_string()],
            },
        ],
        foreign_keys: vec![ForeignKey::new(
            "orders",
            vec!["user_id".to_string()],
            "users",
            vec!["id".to_string()],
        )],
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_statement(&self, sql: &str) -> Result<QueryResult> {
        self.executed
            .lock()
            .expect("executed lock poisoned")
            .push(sql.to_string());

        for (pattern, message) in &self.failures {
            if sql.contains(pattern.as_str()) {
                return Err(SqlwrightError::query(message.clone()));
            }
        }

        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            Ok(QueryResult {
                columns: vec![ColumnInfo::new("result", "text")],
                rows: vec![vec![Value::String(format!("Mock result for: {}", sql))]],
                execution_time: Duration::from_millis(1),
                row_count: 1,
                was_truncated: false,
            })
        } else {
            // Non-SELECT statements return an empty result
            Ok(QueryResult {
                execution_time: Duration::from_millis(1),
                ..QueryResult::default()
            })
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
