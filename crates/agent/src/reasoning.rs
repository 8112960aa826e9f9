//! The reasoning capability: maps a conversation to tool invocations or a
//! direct answer.
//!
//! Nodes only ever see the [`ReasoningCapability`] trait, so tests drive
//! them with scripted outcomes. [`ProviderReasoner`] is the production
//! binding over any chat-completions [`Provider`].

use async_trait::async_trait;
use liftlog_core::error::ProviderError;
use liftlog_core::message::Message;
use liftlog_core::provider::{Provider, ProviderRequest, ToolDefinition};
use liftlog_core::tool::ToolCall;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::state::{TraceEntry, TraceKind};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are liftlog, a strength-training and nutrition \
assistant. Use the available tools to read or record a user's workouts and nutrition whenever \
the question needs their data; tool results are JSON envelopes with a status field. When a tool \
reports an error, explain it to the user in plain words. Answer concisely and never invent \
logged data.";

/// Input to one reasoning call.
#[derive(Debug, Clone, Default)]
pub struct ReasoningRequest {
    /// The turn to respond to
    pub input: String,
    /// Turns before `input`, oldest first
    pub chat_history: Vec<Message>,
    /// Turns after `input` produced during this run (tool calls and their results)
    pub scratchpad: Vec<Message>,
    /// Tools the model may call; empty forces a text answer
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningAction {
    Invoke(Vec<ToolCall>),
    Answer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningOutcome {
    pub action: ReasoningAction,
    pub trace: Vec<TraceEntry>,
}

impl ReasoningOutcome {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            action: ReasoningAction::Answer(text.into()),
            trace: Vec::new(),
        }
    }

    pub fn invoke(calls: Vec<ToolCall>) -> Self {
        Self {
            action: ReasoningAction::Invoke(calls),
            trace: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed arguments for tool call '{tool_name}': {reason}")]
    MalformedToolCall { tool_name: String, reason: String },

    #[error("Model returned neither tool calls nor an answer")]
    EmptyResponse,
}

#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningOutcome, ReasoningError>;
}

/// Reasoning over a chat-completions provider.
pub struct ProviderReasoner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl ProviderReasoner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn build_messages(&self, request: ReasoningRequest) -> Vec<Message> {
        let mut messages =
            Vec::with_capacity(request.chat_history.len() + request.scratchpad.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(request.chat_history);
        messages.push(Message::user(request.input));
        messages.extend(request.scratchpad);
        messages
    }
}

#[async_trait]
impl ReasoningCapability for ProviderReasoner {
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningOutcome, ReasoningError> {
        let tools = request.tools.clone();
        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages: self.build_messages(request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
        };

        let response = self.provider.complete(provider_request).await?;
        let message = response.message;
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            tool_calls = message.tool_calls.len(),
            "Reasoning response received"
        );

        if !message.tool_calls.is_empty() {
            let mut trace = Vec::new();
            if !message.content.trim().is_empty() {
                trace.push(TraceEntry::new(TraceKind::Thought, message.content.trim()));
            }

            let mut calls = Vec::with_capacity(message.tool_calls.len());
            for call in message.tool_calls {
                let arguments = if call.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        ReasoningError::MalformedToolCall {
                            tool_name: call.name.clone(),
                            reason: e.to_string(),
                        }
                    })?
                };
                trace.push(TraceEntry::new(
                    TraceKind::Action,
                    format!("{}({})", call.name, arguments),
                ));
                calls.push(ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments,
                });
            }

            return Ok(ReasoningOutcome {
                action: ReasoningAction::Invoke(calls),
                trace,
            });
        }

        if message.content.trim().is_empty() {
            return Err(ReasoningError::EmptyResponse);
        }

        Ok(ReasoningOutcome::answer(message.content))
    }
}
