//! The orchestration core of liftlog.
//!
//! One question becomes one run through a small acyclic graph:
//!
//! 1. **AgentDecision** asks the reasoning capability for tool invocations
//!    or a direct answer
//! 2. the **router** picks the next node from the execution record
//! 3. **ToolExecutor** runs the invocations (in order, fail-fast)
//! 4. **ResultProcessor** returns the answer, synthesizing it from tool
//!    results when tools ran
//! 5. **ErrorHandler** turns any recorded failure into a safe reply
//!
//! No node returns an error. Failures are recorded in the
//! [`ExecutionRecord`] and the router sends the run to ErrorHandler.

pub mod graph;
pub mod nodes;
pub mod reasoning;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use graph::{AgentGraph, GraphOptions, InvokeRequest, InvokeResponse};
pub use nodes::{AgentDecision, ErrorHandler, ResultProcessor, ToolExecutor};
pub use reasoning::{
    DEFAULT_SYSTEM_PROMPT, ProviderReasoner, ReasoningAction, ReasoningCapability, ReasoningError,
    ReasoningOutcome, ReasoningRequest,
};
pub use state::{
    Decision, ErrorCode, ErrorInfo, ErrorPayload, ExecutionRecord, NodeName, ToolOutput, TraceEntry,
    TraceKind,
};
