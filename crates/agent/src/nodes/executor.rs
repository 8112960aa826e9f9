//! ToolExecutor: runs the decided invocations against the tool catalog.
//!
//! The batch runs in order and fails fast. Outputs are staged and only
//! committed to the record once every invocation has succeeded, so a
//! failed batch leaves `tool_outputs` untouched.

use futures::FutureExt;
use liftlog_core::message::Message;
use liftlog_core::tool::ToolRegistry;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{call_budget, with_deadline};
use crate::state::{
    Decision, ErrorCode, ExecutionRecord, NodeName, ToolOutput, TraceEntry, TraceKind,
};

const CRASH_USER_MESSAGE: &str =
    "An unexpected error occurred while running a tool. Please contact the development team.";

pub struct ToolExecutor {
    tools: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, record: &mut ExecutionRecord) {
        let invocations = match &record.decision {
            Some(Decision::ToolCall { invocations }) => invocations.clone(),
            _ => Vec::new(),
        };

        if invocations.is_empty() {
            record.fail(
                ErrorCode::ToolCallMissing,
                NodeName::ToolExecutor,
                "ToolExecutor reached without any tool invocations",
                "An internal error prevented the tools from being prepared.",
            );
            return;
        }

        let mut staged = Vec::with_capacity(invocations.len());

        for call in &invocations {
            if !self.tools.contains(&call.name) {
                warn!(node = %NodeName::ToolExecutor, tool = %call.name, "Unknown tool requested");
                record.fail(
                    ErrorCode::ToolNotFound,
                    NodeName::ToolExecutor,
                    format!("Requested tool '{}' is not registered", call.name),
                    "No tool is available to handle that request.",
                );
                return;
            }

            debug!(
                node = %NodeName::ToolExecutor,
                tool = %call.name,
                call_id = %call.id,
                "Executing tool"
            );
            let budget = call_budget(self.timeout, record.deadline);
            let execution = AssertUnwindSafe(self.tools.execute(call)).catch_unwind();

            let envelope = match with_deadline(budget, execution).await {
                Ok(Ok(Ok(envelope))) => envelope,
                Ok(Ok(Err(e))) => {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                    record.fail(
                        ErrorCode::ToolExecutionFailure,
                        NodeName::ToolExecutor,
                        format!("Tool '{}' failed: {e}", call.name),
                        CRASH_USER_MESSAGE,
                    );
                    return;
                }
                Ok(Err(panic)) => {
                    let reason = panic_message(panic.as_ref());
                    warn!(tool = %call.name, reason = %reason, "Tool panicked");
                    record.fail(
                        ErrorCode::ToolExecutionFailure,
                        NodeName::ToolExecutor,
                        format!("Tool '{}' panicked: {reason}", call.name),
                        CRASH_USER_MESSAGE,
                    );
                    return;
                }
                Err(_) => {
                    let secs = budget.map(|t| t.as_secs_f64()).unwrap_or_default();
                    warn!(tool = %call.name, timeout_secs = secs, "Tool timed out");
                    record.fail(
                        ErrorCode::ToolTimeout,
                        NodeName::ToolExecutor,
                        format!("Tool '{}' exceeded its {secs:.3}s budget", call.name),
                        "A tool took too long to respond. Please try again.",
                    );
                    return;
                }
            };

            let content = match envelope.to_payload() {
                Ok(content) => content,
                Err(e) => {
                    record.fail(
                        ErrorCode::ToolExecutionFailure,
                        NodeName::ToolExecutor,
                        format!("Result of tool '{}' could not be serialized: {e}", call.name),
                        CRASH_USER_MESSAGE,
                    );
                    return;
                }
            };

            staged.push(ToolOutput {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                envelope,
                content,
            });
        }

        for output in staged {
            record
                .messages
                .push(Message::tool_result(output.call_id.clone(), output.content.clone()));
            record.intermediate_steps.push(TraceEntry::new(
                TraceKind::Observation,
                format!("{} -> {}", output.tool_name, output.content),
            ));
            record.tool_outputs.push(output);
        }
        debug!(
            node = %NodeName::ToolExecutor,
            outputs = record.tool_outputs.len(),
            "Tool batch committed"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
