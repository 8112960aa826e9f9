//! In-memory backend: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::Utc;
use liftlog_core::error::StoreError;
use liftlog_core::store::{
    FitnessStore, NewNutritionEntry, NewWorkoutSession, NutritionEntry, WorkoutSession,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keeps sessions and nutrition entries in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: RwLock<Vec<WorkoutSession>>,
    nutrition: RwLock<Vec<NutritionEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FitnessStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_session(
        &self,
        session: NewWorkoutSession,
    ) -> Result<WorkoutSession, StoreError> {
        let row = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            user_id: session.user_id,
            total_volume: session.total_volume,
            exercises: session.exercises,
            created_at: Utc::now(),
        };
        self.sessions.write().await.push(row.clone());
        Ok(row)
    }

    async fn list_nutrition(&self, user_id: &str) -> Result<Vec<NutritionEntry>, StoreError> {
        let entries = self.nutrition.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_nutrition(
        &self,
        entry: NewNutritionEntry,
    ) -> Result<NutritionEntry, StoreError> {
        let row = NutritionEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            carbs: entry.carbs,
            protein: entry.protein,
            fat: entry.fat,
            extra: entry.extra,
            created_at: Utc::now(),
        };
        self.nutrition.write().await.push(row.clone());
        Ok(row)
    }
}
