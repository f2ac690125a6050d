//! Mock LLM client for testing.

use crate::error::Result;
use crate::llm::{LlmClient, Message};
use async_trait::async_trait;
use std::sync::Mutex;

/// A deterministic LLM client returning queued responses.
///
/// Responses are consumed in order; once the queue is empty a fixed
/// fallback SELECT is returned so tests without expectations still work.
pub struct MockLlmClient {
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a mock with the given responses, returned first to last.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns every message list `complete` has been called with.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::with_responses(Vec::new())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(messages.to_vec());

        let response = self
            .responses
            .lock()
            .expect("mock lock poisoned")
            .pop()
            .unwrap_or_else(|| "```sql\nSELECT 1\n```".to_string());
        Ok(response)
    }
}
