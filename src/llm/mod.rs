//! Natural-language-to-SQL integration.
//!
//! The LLM is an untrusted text-generation collaborator: it receives a
//! question plus a schema context built from cached metadata, and returns a
//! candidate SQL string that is always re-validated before execution.

pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod service;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::extract_sql;
pub use service::NlQueryService;

use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use std::str::FromStr;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

/// A single chat message sent to the LLM.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait for LLM clients that can generate completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages, returned as one string.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        (**self).complete(messages).await
    }
}

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    OpenAi,
    /// Deterministic client for tests; no API key required.
    Mock,
}

impl FromStr for LlmProvider {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(ScoutError::configuration(format!(
                "Unknown LLM provider: {s}"
            ))),
        }
    }
}

/// Builds the configured LLM client.
pub fn build_client(config: &crate::config::LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.parse::<LlmProvider>()? {
        LlmProvider::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ScoutError::configuration("OPENAI_API_KEY is not set"))?;
            let client = OpenAiClient::new(OpenAiConfig::new(api_key, config.model.clone()))?;
            Ok(Box::new(client))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::default())),
    }
}
