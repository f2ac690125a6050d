//! Query execution log.
//!
//! Append-only record of every query the service was asked to run, successful
//! or not. Entries are never updated; deleting a connection cascades to its
//! entries, while entries that never resolved a connection keep a NULL
//! connection_id and stay.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Outcome of a logged query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Error,
    Timeout,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "error" => Self::Error,
            "timeout" => Self::Timeout,
            _ => Self::Pending,
        }
    }
}

/// Fields for appending one execution log entry.
#[derive(Debug, Clone)]
pub struct NewExecution {
    /// Connection the query ran against, if it got that far.
    pub connection_id: Option<i64>,
    /// What the caller submitted: SQL, or the natural-language question.
    pub input_sql: String,
    /// SQL produced by the LLM, for natural-language queries.
    pub generated_sql: Option<String>,
    /// SQL actually sent to the target after validation.
    pub sanitized_sql: Option<String>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub row_count: Option<i64>,
}

impl NewExecution {
    /// Starts a log entry for a raw SQL submission.
    pub fn for_sql(input_sql: impl Into<String>) -> Self {
        Self {
            connection_id: None,
            input_sql: input_sql.into(),
            generated_sql: None,
            sanitized_sql: None,
            status: ExecutionStatus::Pending,
            error_message: None,
            execution_time_ms: None,
            row_count: None,
        }
    }
}

/// A stored execution log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: i64,
    pub connection_id: Option<i64>,
    pub input_sql: String,
    pub generated_sql: Option<String>,
    pub sanitized_sql: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub row_count: Option<i64>,
    pub created_at: String,
}

impl TryFrom<String> for ExecutionStatus {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> std::result::Result<Self, std::convert::Infallible> {
        Ok(Self::parse(&s))
    }
}

/// Appends an entry to the execution log. Returns the new entry's id.
pub async fn record(pool: &SqlitePool, new: &NewExecution) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO query_executions
            (connection_id, input_sql, generated_sql, sanitized_sql, status,
             error_message, execution_time_ms, row_count)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(new.connection_id)
    .bind(&new.input_sql)
    .bind(&new.generated_sql)
    .bind(&new.sanitized_sql)
    .bind(new.status.as_str())
    .bind(&new.error_message)
    .bind(new.execution_time_ms)
    .bind(new.row_count)
    .fetch_one(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to record execution: {e}")))?;

    Ok(id)
}

/// Lists the most recent entries, newest first.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<ExecutionRecord>> {
    let rows: Vec<ExecutionRecord> = sqlx::query_as(
        r#"
        SELECT id, connection_id, input_sql, generated_sql, sanitized_sql,
               status, error_message, execution_time_ms, row_count, created_at
        FROM query_executions
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to list executions: {e}")))?;

    Ok(rows)
}
