//! Shared test helpers for node and graph tests.

use async_trait::async_trait;
use liftlog_core::error::{ProviderError, ToolError};
use liftlog_core::message::{Message, MessageToolCall};
use liftlog_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use liftlog_core::tool::{Tool, ToolCall, ToolEnvelope, ToolRegistry};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::reasoning::{ReasoningCapability, ReasoningError, ReasoningOutcome, ReasoningRequest};

// ── Providers ──

/// A mock provider that returns a sequence of scripted responses.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| panic!("SequentialMockProvider: no more responses")))
    }
}

/// A provider whose transport always fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(
    tool_calls: Vec<MessageToolCall>,
    thought: &str,
) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(thought, tool_calls),
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Reasoning ──

/// A reasoning capability that replays scripted outcomes and records
/// every request it receives.
pub struct ScriptedReasoner {
    outcomes: Mutex<VecDeque<Result<ReasoningOutcome, ReasoningError>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
    delay: Option<Duration>,
}

impl ScriptedReasoner {
    pub fn new(outcomes: Vec<Result<ReasoningOutcome, ReasoningError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering (for deadline tests; pair with a paused clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningCapability for ScriptedReasoner {
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningOutcome, ReasoningError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| panic!("ScriptedReasoner: no more outcomes"))
    }
}

pub fn invocation(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

// ── Tools ──

/// Answers with a success envelope whose `data` echoes the arguments.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes the arguments back"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        Ok(ToolEnvelope::success("echo", arguments))
    }
}

/// Answers with a domain-level error envelope.
pub struct DomainErrorTool;

#[async_trait]
impl Tool for DomainErrorTool {
    fn name(&self) -> &str {
        "domain_error"
    }
    fn description(&self) -> &str {
        "Always reports a store failure"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        Ok(ToolEnvelope::error(
            "domain_error",
            "DB_QUERY_FAILURE",
            "connection reset",
            "Could not load your data.",
        ))
    }
}

/// Fails at the harness level.
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "boom".into(),
        })
    }
}

pub struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn name(&self) -> &str {
        "panics"
    }
    fn description(&self) -> &str {
        "Panics when executed"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        panic!("tool exploded")
    }
}

/// Sleeps for an hour before answering.
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Takes forever"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ToolEnvelope::success("slow", serde_json::Value::Null))
    }
}

/// Takes 20 seconds, well inside a 30 second per-call cap.
pub struct SteadyTool;

#[async_trait]
impl Tool for SteadyTool {
    fn name(&self) -> &str {
        "steady"
    }
    fn description(&self) -> &str {
        "Answers after 20 seconds"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        tokio::time::sleep(Duration::from_secs(20)).await;
        Ok(ToolEnvelope::success("steady", serde_json::Value::Null))
    }
}

/// A registry holding every test tool.
pub fn test_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(EchoTool));
    registry.register(Box::new(DomainErrorTool));
    registry.register(Box::new(BrokenTool));
    registry.register(Box::new(PanicTool));
    registry.register(Box::new(SlowTool));
    registry.register(Box::new(SteadyTool));
    Arc::new(registry)
}
