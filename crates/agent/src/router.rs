//! Edge selection between nodes. Pure functions of the record.

use crate::state::{Decision, ExecutionRecord, NodeName};

/// Next node after AgentDecision.
///
/// An error always wins, whatever the decision says.
pub fn route(record: &ExecutionRecord) -> NodeName {
    if record.error_info.is_some() {
        return NodeName::ErrorHandler;
    }
    match &record.decision {
        None => NodeName::ErrorHandler,
        Some(Decision::ToolCall { .. }) => NodeName::ToolExecutor,
        Some(Decision::FinalAnswer { .. }) => NodeName::ResultProcessor,
        Some(Decision::Error) => NodeName::ErrorHandler,
        Some(Decision::SubgraphCall { .. }) => NodeName::ErrorHandler,
    }
}

/// Next node after ToolExecutor.
pub fn route_after_tools(record: &ExecutionRecord) -> NodeName {
    if record.error_info.is_some() {
        NodeName::ErrorHandler
    } else {
        NodeName::ResultProcessor
    }
}

/// Next node after ResultProcessor, or `None` when the run is finished.
pub fn route_after_synthesis(record: &ExecutionRecord) -> Option<NodeName> {
    (record.answer.is_none() && record.error_info.is_some()).then_some(NodeName::ErrorHandler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ErrorCode, ErrorPayload};

    fn all_decisions() -> Vec<Option<Decision>> {
        vec![
            None,
            Some(Decision::ToolCall { invocations: vec![] }),
            Some(Decision::FinalAnswer { text: "a".into() }),
            Some(Decision::SubgraphCall { id: "sub".into() }),
            Some(Decision::Error),
        ]
    }

    #[test]
    fn error_info_always_wins() {
        for decision in all_decisions() {
            let mut record = ExecutionRecord::new("q");
            record.decision = decision;
            record.fail(ErrorCode::ToolNotFound, NodeName::ToolExecutor, "m", "u");
            assert_eq!(route(&record), NodeName::ErrorHandler);

            // Also when the payload is a loose map.
            record.error_info = Some(ErrorPayload::Raw(serde_json::json!({})));
            assert_eq!(route(&record), NodeName::ErrorHandler);
        }
    }

    #[test]
    fn decision_precedence() {
        let expected = [
            NodeName::ErrorHandler,
            NodeName::ToolExecutor,
            NodeName::ResultProcessor,
            NodeName::ErrorHandler,
            NodeName::ErrorHandler,
        ];
        for (decision, want) in all_decisions().into_iter().zip(expected) {
            let mut record = ExecutionRecord::new("q");
            record.decision = decision;
            assert_eq!(route(&record), want);
        }
    }

    #[test]
    fn tool_failure_reaches_error_handler() {
        let mut record = ExecutionRecord::new("q");
        assert_eq!(route_after_tools(&record), NodeName::ResultProcessor);
        record.fail(ErrorCode::ToolTimeout, NodeName::ToolExecutor, "m", "u");
        assert_eq!(route_after_tools(&record), NodeName::ErrorHandler);
    }

    #[test]
    fn synthesis_edges() {
        let mut record = ExecutionRecord::new("q");
        record.finish("done".into());
        assert_eq!(route_after_synthesis(&record), None);

        let mut failed = ExecutionRecord::new("q");
        failed.fail(ErrorCode::SynthesisLlmFailure, NodeName::ResultProcessor, "m", "u");
        assert_eq!(route_after_synthesis(&failed), Some(NodeName::ErrorHandler));
    }
}
