//! The graph driver: composes the nodes into one acyclic run.
//!
//! ```text
//! AgentDecision ──route──┬─> ToolExecutor ──┬─> ResultProcessor ──┬─> end
//!                        │                  │                     │
//!                        ├─> ResultProcessor└─> ErrorHandler      └─> ErrorHandler
//!                        └─> ErrorHandler
//! ```
//!
//! Every path ends in ResultProcessor or ErrorHandler, and no edge leads
//! back to AgentDecision.

use liftlog_config::AgentConfig;
use liftlog_core::tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::nodes::{AgentDecision, ErrorHandler, ResultProcessor, ToolExecutor};
use crate::reasoning::ReasoningCapability;
use crate::router;
use crate::state::{ExecutionRecord, NodeName};

/// Deadlines. `None` waits indefinitely.
///
/// `run_timeout` bounds the whole run; the per-call caps bound each call
/// within it, so a call gets the smaller of its cap and the time left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    pub run_timeout: Option<Duration>,
    /// Cap on each reasoning call (decision and synthesis)
    pub decision_timeout: Option<Duration>,
    /// Cap on each tool invocation
    pub tool_timeout: Option<Duration>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            run_timeout: Some(Duration::from_secs(120)),
            decision_timeout: Some(Duration::from_secs(60)),
            tool_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl GraphOptions {
    /// No deadlines at all.
    pub fn unbounded() -> Self {
        Self {
            run_timeout: None,
            decision_timeout: None,
            tool_timeout: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        Self {
            run_timeout: secs(config.run_timeout_secs),
            decision_timeout: secs(config.decision_timeout_secs),
            tool_timeout: secs(config.tool_timeout_secs),
        }
    }
}

/// Request body of the run entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub question: String,
}

/// Response of the run entry point: the final answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub result: String,
}

pub struct AgentGraph {
    run_timeout: Option<Duration>,
    decision: AgentDecision,
    executor: ToolExecutor,
    processor: ResultProcessor,
    error_handler: ErrorHandler,
}

impl AgentGraph {
    pub fn new(
        reasoner: Arc<dyn ReasoningCapability>,
        tools: Arc<ToolRegistry>,
        options: GraphOptions,
    ) -> Self {
        Self {
            run_timeout: options.run_timeout,
            decision: AgentDecision::new(reasoner.clone(), tools.clone())
                .with_timeout(options.decision_timeout),
            executor: ToolExecutor::new(tools).with_timeout(options.tool_timeout),
            processor: ResultProcessor::new(reasoner).with_timeout(options.decision_timeout),
            error_handler: ErrorHandler,
        }
    }

    /// Answer one question.
    pub async fn invoke(&self, request: InvokeRequest) -> InvokeResponse {
        let record = self.run(request.question).await;
        InvokeResponse {
            result: record.answer.unwrap_or_default(),
        }
    }

    /// Run the graph on a fresh record and return it for inspection.
    pub async fn run(&self, question: impl Into<String>) -> ExecutionRecord {
        let mut record = ExecutionRecord::new(question);
        self.drive(&mut record).await;
        record
    }

    /// Run the graph on a prepared record, starting at AgentDecision.
    ///
    /// A deadline already set on the record is kept; otherwise one is
    /// started from the configured run timeout.
    pub async fn drive(&self, record: &mut ExecutionRecord) {
        if record.deadline.is_none() {
            record.deadline = self.run_timeout.map(|limit| Instant::now() + limit);
        }
        info!(run_id = %record.run_id, "Run started");

        let mut next = Some(NodeName::AgentDecision);
        while let Some(node) = next {
            next = self.step(node, record).await;
        }

        info!(
            run_id = %record.run_id,
            last_node = record.active_node.map(|n| n.as_str()).unwrap_or("none"),
            error_code = record.error_code().unwrap_or("none"),
            tool_outputs = record.tool_outputs.len(),
            "Run finished"
        );
    }

    async fn step(&self, node: NodeName, record: &mut ExecutionRecord) -> Option<NodeName> {
        debug!(run_id = %record.run_id, node = %node, "Entering node");
        record.active_node = Some(node);

        match node {
            NodeName::AgentDecision => {
                self.decision.run(record).await;
                Some(router::route(record))
            }
            NodeName::ToolExecutor => {
                self.executor.run(record).await;
                Some(router::route_after_tools(record))
            }
            NodeName::ResultProcessor => {
                self.processor.run(record).await;
                router::route_after_synthesis(record)
            }
            NodeName::ErrorHandler => {
                self.error_handler.run(record).await;
                None
            }
        }
    }
}
