//! AgentDecision: asks the reasoning capability what to do next.

use liftlog_core::tool::{ToolCall, ToolRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{call_budget, with_deadline};
use crate::reasoning::{ReasoningAction, ReasoningCapability, ReasoningRequest};
use crate::state::{Decision, ErrorCode, ExecutionRecord, NodeName};

/// Input used when the conversation is empty.
pub const NEUTRAL_GREETING: &str = "Hello";

const USER_MESSAGE: &str = "Sorry, I had trouble understanding your question. Please try again.";

pub struct AgentDecision {
    reasoner: Arc<dyn ReasoningCapability>,
    tools: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl AgentDecision {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            reasoner,
            tools,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, record: &mut ExecutionRecord) {
        record.loop_counter += 1;

        let (input, chat_history) = match record.messages.split_last() {
            Some((last, earlier)) => (last.content.clone(), earlier.to_vec()),
            None => (NEUTRAL_GREETING.to_string(), Vec::new()),
        };
        let request = ReasoningRequest {
            input,
            chat_history,
            scratchpad: Vec::new(),
            tools: self.tools.definitions(),
        };

        let budget = call_budget(self.timeout, record.deadline);
        let outcome = match with_deadline(budget, self.reasoner.invoke(request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(node = %NodeName::AgentDecision, error = %e, "Reasoning call failed");
                record.fail(
                    ErrorCode::DecisionLlmFailure,
                    NodeName::AgentDecision,
                    format!("AgentDecision reasoning call failed: {e}"),
                    USER_MESSAGE,
                );
                record.decision = Some(Decision::Error);
                return;
            }
            Err(_) => {
                let secs = budget.map(|t| t.as_secs_f64()).unwrap_or_default();
                warn!(
                    node = %NodeName::AgentDecision,
                    timeout_secs = secs,
                    "Reasoning call timed out"
                );
                record.fail(
                    ErrorCode::DecisionTimeout,
                    NodeName::AgentDecision,
                    format!("AgentDecision reasoning call exceeded its {secs:.3}s budget"),
                    "Sorry, answering took too long. Please try again.",
                );
                record.decision = Some(Decision::Error);
                return;
            }
        };

        record.intermediate_steps.extend(outcome.trace);
        let decision = match outcome.action {
            ReasoningAction::Invoke(calls) => Decision::ToolCall {
                invocations: assign_call_ids(calls),
            },
            ReasoningAction::Answer(text) if text.trim().is_empty() => {
                record.fail(
                    ErrorCode::DecisionLlmFailure,
                    NodeName::AgentDecision,
                    "AgentDecision reasoning call returned a blank answer",
                    USER_MESSAGE,
                );
                Decision::Error
            }
            ReasoningAction::Answer(text) => Decision::FinalAnswer { text },
        };

        debug!(
            node = %NodeName::AgentDecision,
            action_type = decision.action_type(),
            loop_counter = record.loop_counter,
            "Decision made"
        );
        record.decision = Some(decision);
    }
}

/// Give every invocation a unique correlation id, replacing blank or
/// repeated ones.
fn assign_call_ids(mut calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::with_capacity(calls.len());
    for call in &mut calls {
        if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
            call.id = format!("call_{}", Uuid::new_v4().simple());
            seen.insert(call.id.clone());
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::{ReasoningError, ReasoningOutcome};
    use crate::state::{TraceEntry, TraceKind};
    use crate::test_helpers::*;
    use liftlog_core::error::ProviderError;
    use liftlog_core::message::Message;

    fn node(reasoner: Arc<ScriptedReasoner>) -> AgentDecision {
        AgentDecision::new(reasoner, test_registry())
    }

    #[tokio::test]
    async fn direct_answer_becomes_final_answer() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(ReasoningOutcome::answer("Hi!"))]));
        let mut record = ExecutionRecord::new("hello");

        node(reasoner.clone()).run(&mut record).await;

        assert_eq!(record.decision, Some(Decision::FinalAnswer { text: "Hi!".into() }));
        assert_eq!(record.loop_counter, 1);
        assert!(!record.has_error());

        let requests = reasoner.requests();
        assert_eq!(requests[0].input, "hello");
        assert!(requests[0].chat_history.is_empty());
        assert_eq!(requests[0].tools.len(), 6);
    }

    #[tokio::test]
    async fn last_turn_is_input_rest_is_history() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(ReasoningOutcome::answer("ok"))]));
        let mut record = ExecutionRecord::new("first");
        record.messages.push(Message::assistant("reply"));
        record.messages.push(Message::user("second"));

        node(reasoner.clone()).run(&mut record).await;

        let request = &reasoner.requests()[0];
        assert_eq!(request.input, "second");
        assert_eq!(request.chat_history.len(), 2);
    }

    #[tokio::test]
    async fn empty_conversation_uses_greeting() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(ReasoningOutcome::answer(
            "Hello!",
        ))]));
        let mut record = ExecutionRecord::new("ignored");
        record.messages.clear();

        node(reasoner.clone()).run(&mut record).await;

        assert_eq!(reasoner.requests()[0].input, NEUTRAL_GREETING);
        assert!(!record.has_error());
    }

    #[tokio::test]
    async fn tool_calls_and_trace_recorded() {
        let outcome = ReasoningOutcome {
            action: ReasoningAction::Invoke(vec![invocation("c1", "echo", serde_json::json!({}))]),
            trace: vec![TraceEntry::new(TraceKind::Thought, "need data")],
        };
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(outcome)]));
        let mut record = ExecutionRecord::new("q");

        node(reasoner).run(&mut record).await;

        match record.decision {
            Some(Decision::ToolCall { ref invocations }) => assert_eq!(invocations[0].id, "c1"),
            ref other => panic!("expected tool call, got {other:?}"),
        }
        assert_eq!(record.intermediate_steps.len(), 1);
    }

    #[tokio::test]
    async fn reasoning_failure_sets_error_and_still_counts() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Err(ReasoningError::Provider(
            ProviderError::Network("connection refused".into()),
        ))]));
        let mut record = ExecutionRecord::new("q");

        node(reasoner).run(&mut record).await;

        assert_eq!(record.error_code(), Some("DECISION_LLM_FAILURE"));
        assert_eq!(record.decision, Some(Decision::Error));
        assert_eq!(record.loop_counter, 1);
    }

    #[tokio::test]
    async fn blank_answer_is_a_failure() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(ReasoningOutcome::answer("  "))]));
        let mut record = ExecutionRecord::new("q");
        node(reasoner).run(&mut record).await;
        assert_eq!(record.error_code(), Some("DECISION_LLM_FAILURE"));
        assert_eq!(record.decision, Some(Decision::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reasoning_times_out() {
        let reasoner = Arc::new(
            ScriptedReasoner::new(vec![Ok(ReasoningOutcome::answer("late"))])
                .with_delay(Duration::from_secs(120)),
        );
        let mut record = ExecutionRecord::new("q");

        node(reasoner)
            .with_timeout(Some(Duration::from_secs(5)))
            .run(&mut record)
            .await;

        assert_eq!(record.error_code(), Some("DECISION_TIMEOUT"));
        assert_eq!(record.decision, Some(Decision::Error));
        let info = record.error_info.as_ref().unwrap().normalize(&record.run_id);
        assert!(info.message.contains("exceeded its 5.000s budget"), "{}", info.message);
    }

    #[test]
    fn blank_and_duplicate_ids_replaced() {
        let calls = assign_call_ids(vec![
            invocation("a", "echo", serde_json::json!({})),
            invocation("", "echo", serde_json::json!({})),
            invocation("a", "echo", serde_json::json!({})),
        ]);
        assert_eq!(calls[0].id, "a");
        assert!(calls[1].id.starts_with("call_"));
        assert!(calls[2].id.starts_with("call_"));
        let unique: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }
}
