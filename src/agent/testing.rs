//! Mock implementations for testing
//!
//! These let the orchestrator run end to end without network access.

use crate::llm::{ContentBlock, LlmRequest, LlmResponse, LlmService, ProviderError, Usage};
use crate::tools::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock provider that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, ProviderError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text_only(text));
    }

    /// Queue a response requesting one tool call
    pub fn queue_tool_call(&self, id: &str, name: &str, input: Value) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use(id, name, input)],
            usage: Usage::default(),
        });
    }

    pub fn queue_error(&self, error: ProviderError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Tools
// ============================================================================

/// Tool that counts invocations and answers with a fixed output
pub struct CountingTool {
    name: &'static str,
    output: String,
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn new(name: &'static str, output: &str) -> Self {
        Self {
            name,
            output: output.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter, readable after the tool moves into a registry
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> String {
        format!("Counting test tool {}", self.name)
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn run(&self, _input: Value, _ctx: ToolContext) -> ToolOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ToolOutput::success(self.output.clone())
    }
}

/// Tool that always fails
pub struct FailingTool {
    name: &'static str,
    cause: String,
}

impl FailingTool {
    pub fn new(name: &'static str, cause: &str) -> Self {
        Self {
            name,
            cause: cause.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> String {
        "Always fails".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn run(&self, _input: Value, _ctx: ToolContext) -> ToolOutput {
        ToolOutput::error(self.cause.clone())
    }
}

/// Tool that sleeps unless cancelled
pub struct SlowTool {
    name: &'static str,
    duration: Duration,
}

impl SlowTool {
    pub fn new(name: &'static str, duration: Duration) -> Self {
        Self { name, duration }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> String {
        "Sleeps before answering".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn run(&self, _input: Value, ctx: ToolContext) -> ToolOutput {
        tokio::select! {
            () = ctx.cancel.cancelled() => ToolOutput::error("cancelled"),
            () = tokio::time::sleep(self.duration) => ToolOutput::success("done"),
        }
    }
}
