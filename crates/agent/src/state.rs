//! The execution record threaded through every node of one run.
//!
//! A record is created when a question arrives and discarded once a
//! terminal node has set `answer`. Nodes mutate it in place; the router
//! only reads it.

use chrono::{DateTime, Utc};
use liftlog_core::message::Message;
use liftlog_core::tool::{ToolCall, ToolEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use uuid::Uuid;

// ── Nodes ─────────────────────────────────────────────────────────────────

/// The components of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeName {
    AgentDecision,
    ToolExecutor,
    ResultProcessor,
    ErrorHandler,
}

impl NodeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentDecision => "AgentDecision",
            Self::ToolExecutor => "ToolExecutor",
            Self::ResultProcessor => "ResultProcessor",
            Self::ErrorHandler => "ErrorHandler",
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Decision ──────────────────────────────────────────────────────────────

/// What AgentDecision chose to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum Decision {
    ToolCall { invocations: Vec<ToolCall> },
    FinalAnswer { text: String },
    /// Hand-off to a nested graph. No subgraphs are wired; routes to ErrorHandler.
    SubgraphCall { id: String },
    Error,
}

impl Decision {
    /// The wire tag of this variant (`tool_call`, `final_answer`, ...).
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool_call",
            Self::FinalAnswer { .. } => "final_answer",
            Self::SubgraphCall { .. } => "subgraph_call",
            Self::Error => "error",
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Machine-readable failure codes recorded in `error_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DecisionLlmFailure,
    DecisionTimeout,
    ToolCallMissing,
    ToolNotFound,
    ToolExecutionFailure,
    ToolTimeout,
    SynthesisLlmFailure,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionLlmFailure => "DECISION_LLM_FAILURE",
            Self::DecisionTimeout => "DECISION_TIMEOUT",
            Self::ToolCallMissing => "TOOL_CALL_MISSING",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ToolExecutionFailure => "TOOL_EXECUTION_FAILURE",
            Self::ToolTimeout => "TOOL_TIMEOUT",
            Self::SynthesisLlmFailure => "SYNTHESIS_LLM_FAILURE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical failure record.
///
/// `message` is for developers (logs), `user_message` is safe to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error_code: String,
    pub message: String,
    pub user_message: String,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorInfo {
    pub fn new(
        code: ErrorCode,
        node: NodeName,
        message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            error_code: code.as_str().to_string(),
            message: message.into(),
            user_message: user_message.into(),
            node: node.as_str().to_string(),
            trace_id: None,
        }
    }

    /// The catch-all record used when the real one is missing or unreadable.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalError,
            NodeName::ErrorHandler,
            message,
            "An internal system error occurred. Please contact the developers.",
        )
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.error_code == code.as_str()
    }
}

/// `error_info` as it may arrive: already structured, or as a loose JSON map
/// (e.g. injected by an outer caller). [`ErrorPayload::normalize`] turns
/// either into an [`ErrorInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Structured(ErrorInfo),
    Raw(serde_json::Value),
}

impl ErrorPayload {
    /// Canonical form. A raw map lacking any required field, or carrying a
    /// blank `error_code`, becomes an `INTERNAL_ERROR` record.
    pub fn normalize(&self, trace_id: &str) -> ErrorInfo {
        let info = match self {
            Self::Structured(info) => info.clone(),
            Self::Raw(value) => match serde_json::from_value::<ErrorInfo>(value.clone()) {
                Ok(info) => info,
                Err(e) => ErrorInfo::internal(format!("Unreadable error_info ({e}): {value}")),
            },
        };
        let info = if info.error_code.trim().is_empty() {
            let internal = ErrorInfo::internal(format!(
                "error_info from {} carried a blank error_code: {}",
                info.node, info.message
            ));
            match info.trace_id {
                Some(id) => internal.with_trace_id(id),
                None => internal,
            }
        } else {
            info
        };
        match info.trace_id {
            Some(_) => info,
            None => info.with_trace_id(trace_id),
        }
    }

    /// The error code, if one can be read without normalizing.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Structured(info) => Some(&info.error_code),
            Self::Raw(value) => value.get("error_code").and_then(|c| c.as_str()),
        }
    }
}

impl From<ErrorInfo> for ErrorPayload {
    fn from(info: ErrorInfo) -> Self {
        Self::Structured(info)
    }
}

// ── Trace & tool outputs ──────────────────────────────────────────────────

/// A single entry in the reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub kind: TraceKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceKind {
    Thought,
    Action,
    Observation,
}

impl TraceEntry {
    pub fn new(kind: TraceKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One executed invocation, correlated to its call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub call_id: String,
    pub tool_name: String,
    pub envelope: ToolEnvelope,
    /// The envelope serialized as the tool-result payload
    pub content: String,
}

// ── Record ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Run id; doubles as the `trace_id` of every error raised in this run.
    pub run_id: String,
    pub question: String,
    pub messages: Vec<Message>,
    pub intermediate_steps: Vec<TraceEntry>,
    pub decision: Option<Decision>,
    pub tool_outputs: Vec<ToolOutput>,
    pub error_info: Option<ErrorPayload>,
    pub active_node: Option<NodeName>,
    /// Incremented once per AgentDecision pass. Reserved as a re-entry guard;
    /// no edge currently leads back to AgentDecision.
    pub loop_counter: u32,
    pub answer: Option<String>,
    /// When the whole run must be done. Every reasoning call and tool
    /// invocation is bounded by the time left.
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl ExecutionRecord {
    /// A fresh record whose conversation is the question as a user turn.
    pub fn new(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            run_id: Uuid::new_v4().to_string(),
            messages: vec![Message::user(question.clone())],
            question,
            intermediate_steps: Vec::new(),
            decision: None,
            tool_outputs: Vec::new(),
            error_info: None,
            active_node: None,
            loop_counter: 0,
            answer: None,
            deadline: None,
        }
    }

    /// Record a failure raised by `node`.
    pub fn fail(
        &mut self,
        code: ErrorCode,
        node: NodeName,
        message: impl Into<String>,
        user_message: impl Into<String>,
    ) {
        let info = ErrorInfo::new(code, node, message, user_message)
            .with_trace_id(self.run_id.clone());
        self.error_info = Some(ErrorPayload::Structured(info));
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_info.as_ref().and_then(|e| e.error_code())
    }

    pub fn has_error(&self) -> bool {
        self.error_info.is_some()
    }

    /// Set the final answer and append it as an assistant turn.
    pub fn finish(&mut self, answer: String) {
        self.messages.push(Message::assistant(answer.clone()));
        self.answer = Some(answer);
    }
}
