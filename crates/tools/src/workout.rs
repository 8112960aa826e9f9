//! Workout session tools: read a user's history and log a new session.

use std::sync::Arc;

use async_trait::async_trait;
use liftlog_core::error::ToolError;
use liftlog_core::store::{FitnessStore, NewWorkoutSession};
use liftlog_core::tool::{Tool, ToolEnvelope};
use tracing::warn;

use crate::{DB_INSERT_FAILURE, DB_QUERY_FAILURE, required_f64, required_str};

pub struct GetWorkoutHistoryTool {
    store: Arc<dyn FitnessStore>,
}

impl GetWorkoutHistoryTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetWorkoutHistoryTool {
    fn name(&self) -> &str {
        "get_workout_history"
    }

    fn description(&self) -> &str {
        "Get the workout history of a user, newest session first. Each session has \
         total_volume (kg), exercises and created_at."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "ID of the user whose history to fetch"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        let user_id = required_str(&arguments, "user_id")?;

        match self.store.list_sessions(user_id).await {
            Ok(sessions) => {
                let data = serde_json::to_value(&sessions).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                })?;
                Ok(ToolEnvelope::success(self.name(), data).for_user(user_id))
            }
            Err(e) => {
                warn!(tool = self.name(), user_id, error = %e, "Workout history query failed");
                Ok(ToolEnvelope::error(
                    self.name(),
                    DB_QUERY_FAILURE,
                    format!("Failed to fetch workout history: {e}"),
                    "There was a problem loading your workout history. \
                     Please try again in a moment.",
                ))
            }
        }
    }
}

pub struct AddWorkoutSessionTool {
    store: Arc<dyn FitnessStore>,
}

impl AddWorkoutSessionTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

/// `exercises` arrives either as structured JSON or as a string. Strings
/// holding a JSON object or array are unpacked; anything else is kept as text.
fn parse_exercises(value: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
    match value {
        serde_json::Value::Null => Err(ToolError::InvalidArguments(
            "Missing 'exercises' argument".into(),
        )),
        serde_json::Value::String(text) => {
            match serde_json::from_str::<serde_json::Value>(text) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => Ok(parsed),
                _ => Ok(value.clone()),
            }
        }
        other => Ok(other.clone()),
    }
}

#[async_trait]
impl Tool for AddWorkoutSessionTool {
    fn name(&self) -> &str {
        "add_workout_session"
    }

    fn description(&self) -> &str {
        "Log a new workout session for a user. created_at is set automatically."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "ID of the user"
                },
                "total_volume": {
                    "type": "number",
                    "description": "Total lifted volume of the session in kg"
                },
                "exercises": {
                    "type": "string",
                    "description":
                        "Exercises performed with sets and weights (a JSON string is preferred)"
                }
            },
            "required": ["user_id", "total_volume", "exercises"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        let user_id = required_str(&arguments, "user_id")?;
        let total_volume = required_f64(&arguments, "total_volume")?;
        let exercises = parse_exercises(&arguments["exercises"])?;

        let session = NewWorkoutSession {
            user_id: user_id.to_string(),
            total_volume,
            exercises,
        };

        match self.store.insert_session(session).await {
            Ok(row) => {
                let data = serde_json::to_value(vec![row]).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                })?;
                Ok(ToolEnvelope::success(self.name(), data).for_user(user_id))
            }
            Err(e) => {
                warn!(tool = self.name(), user_id, error = %e, "Workout session insert failed");
                Ok(ToolEnvelope::error(
                    self.name(),
                    DB_INSERT_FAILURE,
                    format!("Failed to add workout session: {e}"),
                    "Sorry, your workout could not be saved. \
                     Please check the values and try again.",
                ))
            }
        }
    }
}
