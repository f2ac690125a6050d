//! Query execution orchestration.
//!
//! Pipeline: validate and sanitize SQL, resolve the named stored connection,
//! resolve an adapter over the shared pools, execute under a wall-clock
//! timeout, convert column names to camelCase, and append an execution log
//! entry whatever the outcome.

use crate::adapter::QueryOutput;
use crate::error::{ErrorCategory, Result, ScoutError};
use crate::service::database::DatabaseService;
use crate::service::format;
use crate::store::{ExecutionStatus, MetaStore, NewExecution};
use crate::validator::SqlValidator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Service executing validated ad-hoc queries against stored connections.
pub struct QueryService {
    store: Arc<MetaStore>,
    databases: Arc<DatabaseService>,
    validator: SqlValidator,
    timeout: Duration,
}

impl QueryService {
    pub fn new(
        store: Arc<MetaStore>,
        databases: Arc<DatabaseService>,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            databases,
            validator: SqlValidator::new(max_results),
            timeout,
        }
    }

    /// Executes raw SQL against the named stored connection.
    pub async fn execute(&self, connection_name: &str, sql: &str) -> Result<QueryOutput> {
        let entry = NewExecution::for_sql(sql);
        self.run(connection_name, sql, entry).await
    }

    /// Executes LLM-generated SQL for a natural-language question.
    ///
    /// The generated SQL goes through exactly the same validation as raw
    /// user SQL; only the log entry differs.
    pub async fn execute_generated(
        &self,
        connection_name: &str,
        question: &str,
        generated_sql: &str,
    ) -> Result<QueryOutput> {
        let mut entry = NewExecution::for_sql(question);
        entry.generated_sql = Some(generated_sql.to_string());
        self.run(connection_name, generated_sql, entry).await
    }

    async fn run(
        &self,
        connection_name: &str,
        sql: &str,
        mut entry: NewExecution,
    ) -> Result<QueryOutput> {
        let started = Instant::now();
        let result = self.run_inner(connection_name, sql, &mut entry).await;
        entry.execution_time_ms = Some(started.elapsed().as_millis() as i64);

        match &result {
            Ok(output) => {
                entry.status = ExecutionStatus::Success;
                entry.row_count = Some(output.row_count as i64);
            }
            Err(e) => {
                entry.status = if e.category == ErrorCategory::Timeout {
                    ExecutionStatus::Timeout
                } else {
                    ExecutionStatus::Error
                };
                entry.error_message = Some(e.message.clone());
            }
        }

        // The log is diagnostics; a write failure must not fail the query.
        if let Err(e) = self.store.record_execution(&entry).await {
            warn!("Failed to record query execution: {e}");
        }

        result.map_err(|e| e.with_context(sql))
    }

    async fn run_inner(
        &self,
        connection_name: &str,
        sql: &str,
        entry: &mut NewExecution,
    ) -> Result<QueryOutput> {
        let sanitized = self.validator.validate_and_sanitize(sql)?;
        entry.sanitized_sql = Some(sanitized.clone());

        let conn = self.databases.get_by_name(connection_name).await?;
        entry.connection_id = Some(conn.id);

        let adapter = self.databases.adapter_for(&conn).await?;

        debug!(connection = %conn.name, "executing query");
        let output = tokio::time::timeout(self.timeout, adapter.execute_query(&sanitized, self.timeout))
            .await
            .map_err(|_| {
                ScoutError::timeout(format!(
                    "Query exceeded the {} second execution limit",
                    self.timeout.as_secs()
                ))
                .with_suggestion("Narrow the query or raise the configured timeout")
            })??;

        Ok(format::camel_case_columns(output))
    }
}

/// Maps an error category to the wire-level query failure tag.
pub fn error_type_tag(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Validation | ErrorCategory::Syntax => "validation_error",
        ErrorCategory::Timeout => "timeout_error",
        ErrorCategory::Network
        | ErrorCategory::Authentication
        | ErrorCategory::Configuration
        | ErrorCategory::Permission
        | ErrorCategory::Resource => "database_error",
        ErrorCategory::Llm | ErrorCategory::Internal => "execution_error",
    }
}
