//! The four graph nodes.
//!
//! Every node takes the execution record by `&mut` and never returns an
//! error: failures are written to `error_info` for the router to see.

pub mod decision;
pub mod error_handler;
pub mod executor;
pub mod processor;

pub use decision::AgentDecision;
pub use error_handler::ErrorHandler;
pub use executor::ToolExecutor;
pub use processor::ResultProcessor;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio::time::error::Elapsed;

/// Time one call may take: the per-call `cap`, cut down to what is left
/// before `run_deadline`. `None` means unbounded.
pub(crate) fn call_budget(
    cap: Option<Duration>,
    run_deadline: Option<Instant>,
) -> Option<Duration> {
    let remaining =
        run_deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
    match (cap, remaining) {
        (Some(cap), Some(remaining)) => Some(cap.min(remaining)),
        (cap, remaining) => cap.or(remaining),
    }
}

/// Await `future`, bounded by `limit` when one is set.
pub(crate) async fn with_deadline<F: Future>(
    limit: Option<Duration>,
    future: F,
) -> Result<F::Output, Elapsed> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await,
        None => Ok(future.await),
    }
}
