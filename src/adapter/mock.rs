//! Mock adapters for testing.
//!
//! `MockAdapter` serves canned metadata and query results and records every
//! SQL string it is asked to run; `FailingAdapter` fails every operation with
//! a chosen error category.

use crate::adapter::{
    ColumnInfo, ColumnMeta, DatabaseAdapter, ObjectRef, QueryOutput, Value,
};
use crate::engine::EngineType;
use crate::error::{ErrorCategory, Result, ScoutError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// An adapter that returns predefined metadata and results.
pub struct MockAdapter {
    objects: Vec<(ObjectRef, Vec<ColumnMeta>)>,
    result: QueryOutput,
    executed: Mutex<Vec<String>>,
}

impl MockAdapter {
    /// Creates a mock with no objects and a single-row canned result.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            result: QueryOutput::with_data(
                vec![ColumnInfo::new("result", "text")],
                vec![vec![Value::String("mock".into())]],
            ),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock reporting the given objects and their columns.
    pub fn with_objects(objects: Vec<(ObjectRef, Vec<ColumnMeta>)>) -> Self {
        Self {
            objects,
            ..Self::new()
        }
    }

    /// Replaces the canned query result.
    pub fn with_result(mut self, result: QueryOutput) -> Self {
        self.result = result;
        self
    }

    /// Returns every SQL string `execute_query` has been given, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().expect("mock lock poisoned").clone()
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseAdapter for MockAdapter {
    fn engine(&self) -> EngineType {
        EngineType::Postgres
    }

    async fn test_connection(&self) -> bool {
        true
    }

    async fn list_tables(&self) -> Result<Vec<ObjectRef>> {
        Ok(self
            .objects
            .iter()
            .filter(|(obj, _)| obj.object_type == crate::adapter::ObjectType::Table)
            .map(|(obj, _)| obj.clone())
            .collect())
    }

    async fn list_views(&self) -> Result<Vec<ObjectRef>> {
        Ok(self
            .objects
            .iter()
            .filter(|(obj, _)| obj.object_type == crate::adapter::ObjectType::View)
            .map(|(obj, _)| obj.clone())
            .collect())
    }

    async fn list_columns(&self, _schema: Option<&str>, object: &str) -> Result<Vec<ColumnMeta>> {
        Ok(self
            .objects
            .iter()
            .find(|(obj, _)| obj.name == object)
            .map(|(_, cols)| cols.clone())
            .unwrap_or_default())
    }

    async fn execute_query(&self, sql: &str, _timeout: Duration) -> Result<QueryOutput> {
        self.executed
            .lock()
            .expect("mock lock poisoned")
            .push(sql.to_string());
        Ok(self.result.clone())
    }
}

/// An adapter that fails every operation with the configured category.
pub struct FailingAdapter {
    category: ErrorCategory,
    message: String,
}

impl FailingAdapter {
    /// Creates an adapter failing with the given category and message.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    fn error(&self) -> ScoutError {
        match self.category {
            ErrorCategory::Network => ScoutError::network(&self.message),
            ErrorCategory::Authentication => ScoutError::authentication(&self.message),
            ErrorCategory::Configuration => ScoutError::configuration(&self.message),
            ErrorCategory::Validation => ScoutError::validation(&self.message),
            ErrorCategory::Syntax => ScoutError::syntax(&self.message),
            ErrorCategory::Permission => ScoutError::permission(&self.message),
            ErrorCategory::Timeout => ScoutError::timeout(&self.message),
            ErrorCategory::Resource => ScoutError::resource(&self.message),
            ErrorCategory::Llm => ScoutError::llm(&self.message),
            ErrorCategory::Internal => ScoutError::internal(&self.message),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for FailingAdapter {
    fn engine(&self) -> EngineType {
        EngineType::Postgres
    }

    async fn test_connection(&self) -> bool {
        false
    }

    async fn list_tables(&self) -> Result<Vec<ObjectRef>> {
        Err(self.error())
    }

    async fn list_views(&self) -> Result<Vec<ObjectRef>> {
        Err(self.error())
    }

    async fn list_columns(&self, _schema: Option<&str>, _object: &str) -> Result<Vec<ColumnMeta>> {
        Err(self.error())
    }

    async fn execute_query(&self, _sql: &str, _timeout: Duration) -> Result<QueryOutput> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_queries() {
        let adapter = MockAdapter::new();
        let result = adapter
            .execute_query("SELECT 1", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(adapter.executed_queries(), vec!["SELECT 1".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_adapter_category() {
        let adapter = FailingAdapter::new(ErrorCategory::Network, "connection refused");
        assert!(!adapter.test_connection().await);
        let err = adapter.list_tables().await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Network);
    }
}
