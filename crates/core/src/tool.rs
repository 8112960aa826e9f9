//! Tool trait and the tool catalog.
//!
//! Tools are what give the agent the ability to act: read a user's workout
//! history, log a new session, and so on. Every tool answers with a
//! [`ToolEnvelope`], including when its own backing operation fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The standardized result every tool returns.
///
/// `Error` is a *domain* failure reported by the tool itself (e.g. the store
/// rejected a query). It is still a successful execution from the harness's
/// point of view and is handed to the model for a natural-language reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolEnvelope {
    Success {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        data: serde_json::Value,
    },
    Error {
        action: String,
        error_code: String,
        message: String,
        user_message: String,
    },
}

impl ToolEnvelope {
    pub fn success(action: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Success {
            action: action.into(),
            user_id: None,
            data,
        }
    }

    pub fn error(
        action: impl Into<String>,
        error_code: impl Into<String>,
        message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self::Error {
            action: action.into(),
            error_code: error_code.into(),
            message: message.into(),
            user_message: user_message.into(),
        }
    }

    /// Attach the user the operation ran for. No-op on error envelopes.
    pub fn for_user(mut self, id: impl Into<String>) -> Self {
        if let Self::Success { user_id, .. } = &mut self {
            *user_id = Some(id.into());
        }
        self
    }

    pub fn action(&self) -> &str {
        match self {
            Self::Success { action, .. } | Self::Error { action, .. } => action,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Serialize the envelope as the tool-result payload shown to the model.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The core Tool trait.
///
/// `execute` returns `Err` only for harness-level failures (bad arguments,
/// unexpected internal faults). Anything the tool can describe to the user
/// belongs in an error envelope.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_workout_history").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tool catalog: a name → tool mapping.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// run afterwards.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions (for sending to the LLM), ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolEnvelope, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone()).await
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
