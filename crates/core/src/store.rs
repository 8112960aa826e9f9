//! FitnessStore trait: the fitness log the tools and the HTTP API read
//! and write.
//!
//! The store is the only mutable state shared between concurrent runs.
//! Backends are expected to make single-row inserts atomic; no operation
//! spans more than one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// One logged workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    /// Total lifted volume in kg
    pub total_volume: f64,
    /// Free-form exercise breakdown (object, array, or text)
    pub exercises: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Input for [`FitnessStore::insert_session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkoutSession {
    pub user_id: String,
    pub total_volume: f64,
    pub exercises: serde_json::Value,
}

/// One logged meal / daily macro entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEntry {
    pub id: String,
    pub user_id: String,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    /// Additional nutrients (bcaa, creatine, ...) stored alongside the macros
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`FitnessStore::insert_nutrition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNutritionEntry {
    pub user_id: String,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Row columns of [`NutritionEntry`]. An `extra` key with one of these names
/// would shadow the real column once the row is serialized.
pub const RESERVED_NUTRITION_KEYS: &[&str] =
    &["id", "user_id", "carbs", "protein", "fat", "created_at"];

impl NewNutritionEntry {
    /// Remove `extra` keys that collide with row columns. Returns the
    /// removed key names.
    pub fn strip_reserved_extras(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        for key in RESERVED_NUTRITION_KEYS {
            if self.extra.remove(*key).is_some() {
                removed.push((*key).to_string());
            }
        }
        removed
    }
}

/// Storage backend for the fitness log.
#[async_trait]
pub trait FitnessStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// All sessions of a user, newest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>, StoreError>;

    /// Insert a session and return the stored row.
    async fn insert_session(
        &self,
        session: NewWorkoutSession,
    ) -> Result<WorkoutSession, StoreError>;

    /// All nutrition entries of a user, newest first.
    async fn list_nutrition(&self, user_id: &str) -> Result<Vec<NutritionEntry>, StoreError>;

    /// Insert a nutrition entry and return the stored row.
    async fn insert_nutrition(
        &self,
        entry: NewNutritionEntry,
    ) -> Result<NutritionEntry, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nutrition_extra_fields_flatten() {
        let entry: NewNutritionEntry = serde_json::from_value(serde_json::json!({
            "user_id": "U1",
            "carbs": 250.0,
            "protein": 160.0,
            "fat": 70.0,
            "creatine": 5
        }))
        .unwrap();
        assert_eq!(entry.extra.get("creatine"), Some(&serde_json::json!(5)));
        assert!(!entry.extra.contains_key("carbs"));
    }

    #[test]
    fn reserved_extras_are_stripped() {
        let mut entry = NewNutritionEntry {
            user_id: "U1".into(),
            carbs: 250.0,
            protein: 180.0,
            fat: 70.0,
            extra: serde_json::json!({"carbs": 1, "id": "fake", "bcaa": 10})
                .as_object()
                .unwrap()
                .clone(),
        };

        let removed = entry.strip_reserved_extras();

        assert_eq!(removed, vec!["id".to_string(), "carbs".to_string()]);
        assert_eq!(entry.extra.len(), 1);
        assert_eq!(entry.extra["bcaa"], 10);
    }

    #[test]
    fn session_serializes_exercises_verbatim() {
        let session = WorkoutSession {
            id: "s1".into(),
            user_id: "U1".into(),
            total_volume: 1000.0,
            exercises: serde_json::json!({"squat": "5x5@100kg"}),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["exercises"]["squat"], "5x5@100kg");
    }
}
