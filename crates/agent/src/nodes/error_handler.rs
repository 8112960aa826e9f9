//! ErrorHandler: terminal node for every failed run.

use tracing::{debug, error};

use crate::state::{ErrorInfo, ErrorPayload, ExecutionRecord, NodeName};

pub struct ErrorHandler;

impl ErrorHandler {
    pub async fn run(&self, record: &mut ExecutionRecord) {
        let info = match &record.error_info {
            Some(payload) => payload.normalize(&record.run_id),
            None => ErrorInfo::internal("ErrorHandler reached without error_info")
                .with_trace_id(record.run_id.clone()),
        };

        error!(
            node = %info.node,
            error_code = %info.error_code,
            message = %info.message,
            trace_id = info.trace_id.as_deref().unwrap_or_default(),
            "Run failed"
        );

        let answer = user_facing_answer(&info);
        record.error_info = Some(ErrorPayload::Structured(info));
        record.finish(answer);
        debug!(node = %NodeName::ErrorHandler, "Error answer ready");
    }
}

/// The reply shown to the user. Depends only on `info`.
pub fn user_facing_answer(info: &ErrorInfo) -> String {
    format!(
        "Sorry, something went wrong: {}\n\n(error code: {})",
        info.user_message, info.error_code
    )
}
