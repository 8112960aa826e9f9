//! Fitness log tools for the liftlog agent.
//!
//! Each tool wraps one [`FitnessStore`] operation and reports through a
//! [`ToolEnvelope`](liftlog_core::tool::ToolEnvelope). Store failures come
//! back as error envelopes (`DB_QUERY_FAILURE`, `DB_INSERT_FAILURE`) so the
//! model can explain them to the user; malformed arguments are harness
//! errors.

pub mod nutrition;
pub mod workout;

use std::sync::Arc;

use liftlog_core::error::ToolError;
use liftlog_core::store::FitnessStore;
use liftlog_core::tool::ToolRegistry;

pub use nutrition::{AddNutritionEntryTool, GetNutritionLogTool};
pub use workout::{AddWorkoutSessionTool, GetWorkoutHistoryTool};

/// Error code for a failed store read.
pub const DB_QUERY_FAILURE: &str = "DB_QUERY_FAILURE";
/// Error code for a failed store write.
pub const DB_INSERT_FAILURE: &str = "DB_INSERT_FAILURE";

/// Create the tool catalog backed by `store`.
pub fn default_registry(store: Arc<dyn FitnessStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetWorkoutHistoryTool::new(store.clone())));
    registry.register(Box::new(AddWorkoutSessionTool::new(store.clone())));
    registry.register(Box::new(GetNutritionLogTool::new(store.clone())));
    registry.register(Box::new(AddNutritionEntryTool::new(store)));
    registry
}

pub(crate) fn required_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Numbers sent as strings ("150.5") are accepted too; models do that a lot.
pub(crate) fn required_f64(arguments: &serde_json::Value, key: &str) -> Result<f64, ToolError> {
    let value = &arguments[key];
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be a number")))
}
