//! NL-to-SQL orchestration.
//!
//! Builds the prompt from cached metadata, asks the LLM for a candidate SQL
//! string, and hands it to the query service. Generated SQL always passes
//! through the validator there; this path can never bypass it.

use crate::adapter::QueryOutput;
use crate::error::{Result, ScoutError};
use crate::llm::{parser, prompt, LlmClient};
use crate::service::{DatabaseService, QueryService};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of answering a natural-language question.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NlAnswer {
    /// The SQL the model produced (pre-sanitization).
    pub generated_sql: String,
    /// The executed result.
    pub result: QueryOutput,
}

/// Service turning natural-language questions into executed queries.
pub struct NlQueryService {
    client: Box<dyn LlmClient>,
    databases: Arc<DatabaseService>,
    queries: Arc<QueryService>,
}

impl NlQueryService {
    pub fn new(
        client: Box<dyn LlmClient>,
        databases: Arc<DatabaseService>,
        queries: Arc<QueryService>,
    ) -> Self {
        Self {
            client,
            databases,
            queries,
        }
    }

    /// Generates a candidate SQL string for a question, without executing it.
    pub async fn generate_sql(&self, connection_name: &str, question: &str) -> Result<String> {
        let conn = self.databases.get_by_name(connection_name).await?;

        // Make sure a schema context exists; if the target is unreachable,
        // fall back to whatever is cached rather than failing the question.
        if let Err(e) = self.databases.ensure_metadata(conn.id).await {
            warn!(connection = %conn.name, "metadata refresh failed, using cached schema: {e}");
        }
        let metadata = self.databases.list_metadata(conn.id).await?;

        let schema_context = prompt::build_schema_context(&metadata);
        let messages = prompt::build_messages(question, &schema_context);

        debug!(connection = %conn.name, "requesting SQL generation");
        let response = self.client.complete(&messages).await?;

        parser::extract_sql(&response).ok_or_else(|| {
            ScoutError::llm("The model did not return a SQL statement")
                .with_user_message("Could not generate SQL for this question")
                .with_context(response)
        })
    }

    /// Answers a question end to end: generate SQL, validate, execute.
    pub async fn ask(&self, connection_name: &str, question: &str) -> Result<NlAnswer> {
        let generated_sql = self.generate_sql(connection_name, question).await?;
        info!(sql_len = generated_sql.len(), "generated SQL candidate");

        let result = self
            .queries
            .execute_generated(connection_name, question, &generated_sql)
            .await?;

        Ok(NlAnswer {
            generated_sql,
            result,
        })
    }
}
