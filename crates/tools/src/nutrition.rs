//! Nutrition tools: read a user's macro log and add an entry.

use std::sync::Arc;

use async_trait::async_trait;
use liftlog_core::error::ToolError;
use liftlog_core::store::{FitnessStore, NewNutritionEntry};
use liftlog_core::tool::{Tool, ToolEnvelope};
use tracing::warn;

use crate::{DB_INSERT_FAILURE, DB_QUERY_FAILURE, required_f64, required_str};

pub struct GetNutritionLogTool {
    store: Arc<dyn FitnessStore>,
}

impl GetNutritionLogTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetNutritionLogTool {
    fn name(&self) -> &str {
        "get_nutrition_log"
    }

    fn description(&self) -> &str {
        "Get the nutrition log of a user (carbs, protein, fat in grams plus any extra \
         nutrients), newest entry first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "ID of the user whose log to fetch"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        let user_id = required_str(&arguments, "user_id")?;

        match self.store.list_nutrition(user_id).await {
            Ok(entries) => {
                let data = serde_json::to_value(&entries).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                })?;
                Ok(ToolEnvelope::success(self.name(), data).for_user(user_id))
            }
            Err(e) => {
                warn!(tool = self.name(), user_id, error = %e, "Nutrition log query failed");
                Ok(ToolEnvelope::error(
                    self.name(),
                    DB_QUERY_FAILURE,
                    format!("Failed to fetch nutrition log: {e}"),
                    "There was a problem loading your nutrition log. Please try again in a moment.",
                ))
            }
        }
    }
}

pub struct AddNutritionEntryTool {
    store: Arc<dyn FitnessStore>,
}

impl AddNutritionEntryTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddNutritionEntryTool {
    fn name(&self) -> &str {
        "add_nutrition_entry"
    }

    fn description(&self) -> &str {
        "Log a nutrition entry for a user: carbs, protein and fat in grams, plus optional \
         extra nutrients."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string", "description": "ID of the user" },
                "carbs": { "type": "number", "description": "Carbohydrates in grams" },
                "protein": { "type": "number", "description": "Protein in grams" },
                "fat": { "type": "number", "description": "Fat in grams" },
                "extra": {
                    "type": "object",
                    "description": "Additional nutrients by name, e.g. {\"creatine\": 5}"
                }
            },
            "required": ["user_id", "carbs", "protein", "fat"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolEnvelope, ToolError> {
        let user_id = required_str(&arguments, "user_id")?;
        let extra = match &arguments["extra"] {
            serde_json::Value::Null => serde_json::Map::new(),
            serde_json::Value::Object(map) => map.clone(),
            _ => return Err(ToolError::InvalidArguments("'extra' must be an object".into())),
        };

        let mut entry = NewNutritionEntry {
            user_id: user_id.to_string(),
            carbs: required_f64(&arguments, "carbs")?,
            protein: required_f64(&arguments, "protein")?,
            fat: required_f64(&arguments, "fat")?,
            extra,
        };
        let shadowing = entry.strip_reserved_extras();
        if !shadowing.is_empty() {
            warn!(
                tool = self.name(),
                user_id,
                keys = ?shadowing,
                "Dropped extra nutrients named like columns"
            );
        }

        match self.store.insert_nutrition(entry).await {
            Ok(row) => {
                let data = serde_json::to_value(vec![row]).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                })?;
                Ok(ToolEnvelope::success(self.name(), data).for_user(user_id))
            }
            Err(e) => {
                warn!(tool = self.name(), user_id, error = %e, "Nutrition entry insert failed");
                Ok(ToolEnvelope::error(
                    self.name(),
                    DB_INSERT_FAILURE,
                    format!("Failed to add nutrition entry: {e}"),
                    "Sorry, your nutrition entry could not be saved. \
                     Please check the values and try again.",
                ))
            }
        }
    }
}
