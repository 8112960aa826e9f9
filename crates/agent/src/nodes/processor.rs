//! ResultProcessor: produces the final answer, synthesizing one from tool
//! results when tools ran.

use liftlog_core::message::{Message, MessageToolCall};
use liftlog_core::tool::ToolCall;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{call_budget, with_deadline};
use crate::reasoning::{ReasoningAction, ReasoningCapability, ReasoningRequest};
use crate::state::{Decision, ErrorCode, ExecutionRecord, NodeName};

/// Answer for a state the router should never hand over (tool call decision
/// without tool outputs).
pub const INCONSISTENT_STATE_ANSWER: &str = "Sorry, your request could not be processed, \
and the failure was not routed to the error handler. (internal logic error)";

const SYNTHESIS_USER_MESSAGE: &str =
    "Your request was processed, but I could not put the answer into words. Please try again.";

pub struct ResultProcessor {
    reasoner: Arc<dyn ReasoningCapability>,
    timeout: Option<Duration>,
}

impl ResultProcessor {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>) -> Self {
        Self {
            reasoner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, record: &mut ExecutionRecord) {
        let answer = match record.decision.clone() {
            Some(Decision::FinalAnswer { text }) => text,
            Some(Decision::ToolCall { invocations }) if !record.tool_outputs.is_empty() => {
                match self.synthesize(record, &invocations).await {
                    Ok(text) => text,
                    Err(reason) => {
                        warn!(
                            node = %NodeName::ResultProcessor,
                            reason = %reason,
                            "Synthesis failed"
                        );
                        record.fail(
                            ErrorCode::SynthesisLlmFailure,
                            NodeName::ResultProcessor,
                            format!("ResultProcessor synthesis failed: {reason}"),
                            SYNTHESIS_USER_MESSAGE,
                        );
                        return;
                    }
                }
            }
            _ => {
                warn!(
                    node = %NodeName::ResultProcessor,
                    "Reached without an answer or tool outputs"
                );
                INCONSISTENT_STATE_ANSWER.to_string()
            }
        };

        debug!(node = %NodeName::ResultProcessor, chars = answer.len(), "Answer ready");
        record.finish(answer);
    }

    /// Re-run reasoning with the tool results as the newest turns.
    async fn synthesize(
        &self,
        record: &mut ExecutionRecord,
        invocations: &[ToolCall],
    ) -> Result<String, String> {
        let tool_start = record.messages.len().saturating_sub(record.tool_outputs.len());
        let mut chat_history = record.messages[..tool_start].to_vec();
        // The human turn is sent as `input`, not as history.
        chat_history.pop();

        let calls = invocations
            .iter()
            .map(|call| MessageToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            })
            .collect();
        let mut scratchpad = vec![Message::assistant_tool_calls("", calls)];
        scratchpad.extend_from_slice(&record.messages[tool_start..]);

        let request = ReasoningRequest {
            input: record.question.clone(),
            chat_history,
            scratchpad,
            tools: Vec::new(),
        };

        let budget = call_budget(self.timeout, record.deadline);
        let outcome = match with_deadline(budget, self.reasoner.invoke(request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                let secs = budget.map(|t| t.as_secs_f64()).unwrap_or_default();
                return Err(format!("synthesis call exceeded its {secs:.3}s budget"));
            }
        };

        record.intermediate_steps.extend(outcome.trace);
        match outcome.action {
            ReasoningAction::Answer(text) if !text.trim().is_empty() => Ok(text),
            ReasoningAction::Answer(_) => Err("synthesis returned a blank answer".to_string()),
            ReasoningAction::Invoke(calls) => Err(format!(
                "synthesis requested {} more tool call(s) instead of answering",
                calls.len()
            )),
        }
    }
}
