//! Mock LLM Provider for testing
//!
//! Returns queued responses in order and records every request it receives.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock LLM provider that returns queued responses or a default one.
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    responses: Arc<Mutex<VecDeque<Result<CompletionResponse>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// Create a mock provider reporting the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a finished reply.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.push_response(content, "stop");
    }

    /// Queue a reply with an explicit finish reason.
    pub fn push_response(&self, content: impl Into<String>, finish_reason: &str) {
        self.queue(Ok(CompletionResponse {
            content: content.into(),
            usage: None,
            finish_reason: Some(finish_reason.to_string()),
            model: "mock-model".to_string(),
        }));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: Error) {
        self.queue(Err(error));
    }

    fn queue(&self, item: Result<CompletionResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.pop_front().unwrap_or_else(|| {
            Ok(CompletionResponse {
                content: "mock response".to_string(),
                usage: None,
                finish_reason: Some("stop".to_string()),
                model: "mock-model".to_string(),
            })
        })
    }
}
