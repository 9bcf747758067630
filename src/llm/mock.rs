//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus a scripted
//! response queue so tests can drive multi-call flows (generate then repair)
//! and assert on call counts.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Result;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses.
///
/// Responses are resolved in order: scripted queue first, then custom
/// pattern mappings, then the built-in defaults. Used for unit testing
/// without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Responses popped one per call, before any pattern matching.
    script: Mutex<VecDeque<String>>,
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Number of completed calls.
    calls: Mutex<usize>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues responses returned one per call, in order.
    ///
    /// Once the queue is empty the client falls back to pattern matching.
    /// An empty string is a valid scripted response and simulates a model
    /// returning no usable text.
    pub fn with_script<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut script = self.script.lock().expect("script lock poisoned");
            script.extend(responses.into_iter().map(Into::into));
        }
        self
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Returns the number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().expect("calls lock poisoned")
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("explain this query") {
            return "This query reads rows from the requested table.".to_string();
        }

        if input_lower.contains("all users") || input_lower.contains("show users") {
            return "```sql\nSELECT * FROM users;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("users") {
            return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
        }

        if input_lower.contains("orders") && input_lower.contains("user") {
            return "```sql\nSELECT o.* FROM orders o\nJOIN users u ON o.user_id = u.id;\n```"
                .to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        *self.calls.lock().expect("calls lock poisoned") += 1;

        if let Some(scripted) = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
        {
            return Ok(scripted);
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
