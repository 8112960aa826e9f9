//! SQLite backend.
//!
//! One database file with two tables:
//! - `sessions`: workout sessions, `exercises` stored as JSON text
//! - `nutrition`: macro entries, additional nutrients stored as a JSON object
//!
//! Timestamps are fixed-width RFC 3339 strings so `ORDER BY created_at`
//! sorts chronologically.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use liftlog_core::error::StoreError;
use liftlog_core::store::{
    FitnessStore, NewNutritionEntry, NewWorkoutSession, NutritionEntry, WorkoutSession,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral in-process database.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        if path == ":memory:" {
            return Self::in_memory().await;
        }

        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite fitness store initialized at {path}");
        Ok(store)
    }

    /// An in-process database. Limited to one connection, since every
    /// connection to `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite options: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create from an existing pool (runs migrations).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                user_id      TEXT NOT NULL,
                total_volume REAL NOT NULL,
                exercises    TEXT NOT NULL,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nutrition (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT UNIQUE NOT NULL,
                user_id    TEXT NOT NULL,
                carbs      REAL NOT NULL,
                protein    REAL NOT NULL,
                fat        REAL NOT NULL,
                extra      TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("nutrition table: {e}")))?;

        let indexes = [
            ("idx_sessions_user", "sessions"),
            ("idx_nutrition_user", "nutrition"),
        ];
        for (name, table) in indexes {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {name} ON {table}(user_id, created_at DESC)"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("{name}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryFailed(format!("bad created_at '{raw}': {e}")))
    }

    fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<WorkoutSession, StoreError> {
        let exercises: String = Self::column(row, "exercises")?;
        let created_at: String = Self::column(row, "created_at")?;
        Ok(WorkoutSession {
            id: Self::column(row, "id")?,
            user_id: Self::column(row, "user_id")?,
            total_volume: Self::column(row, "total_volume")?,
            // Rows written by other clients may hold plain text here.
            exercises: serde_json::from_str(&exercises)
                .unwrap_or(serde_json::Value::String(exercises)),
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    fn row_to_nutrition(row: &sqlx::sqlite::SqliteRow) -> Result<NutritionEntry, StoreError> {
        let extra: String = Self::column(row, "extra")?;
        let created_at: String = Self::column(row, "created_at")?;
        Ok(NutritionEntry {
            id: Self::column(row, "id")?,
            user_id: Self::column(row, "user_id")?,
            carbs: Self::column(row, "carbs")?,
            protein: Self::column(row, "protein")?,
            fat: Self::column(row, "fat")?,
            extra: serde_json::from_str(&extra).unwrap_or_default(),
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl FitnessStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, total_volume, exercises, created_at FROM sessions \
             WHERE user_id = ? ORDER BY created_at DESC, iid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.iter().map(Self::row_to_session).collect()
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

        sqlx::query(
            "INSERT INTO sessions (id, user_id, total_volume, exercises, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(row.total_volume)
        .bind(row.exercises.to_string())
        .bind(Self::timestamp(row.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::InsertFailed(e.to_string()))?;

        debug!(session_id = %row.id, user_id = %row.user_id, "Stored workout session");
        Ok(row)
    }

    async fn list_nutrition(&self, user_id: &str) -> Result<Vec<NutritionEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, carbs, protein, fat, extra, created_at FROM nutrition \
             WHERE user_id = ? ORDER BY created_at DESC, iid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.iter().map(Self::row_to_nutrition).collect()
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

        sqlx::query(
            "INSERT INTO nutrition (id, user_id, carbs, protein, fat, extra, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(row.carbs)
        .bind(row.protein)
        .bind(row.fat)
        .bind(serde_json::Value::Object(row.extra.clone()).to_string())
        .bind(Self::timestamp(row.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::InsertFailed(e.to_string()))?;

        debug!(entry_id = %row.id, user_id = %row.user_id, "Stored nutrition entry");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_roundtrip_preserves_exercises() {
        let store = SqliteStore::in_memory().await.unwrap();
        let inserted = store
            .insert_session(NewWorkoutSession {
                user_id: "U1".into(),
                total_volume: 150.5,
                exercises: serde_json::json!({"squat": "3x10@100kg", "bench": "3x10@60kg"}),
            })
            .await
            .unwrap();

        let rows = store.list_sessions("U1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, inserted.id);
        assert_eq!(rows[0].total_volume, 150.5);
        assert_eq!(rows[0].exercises["bench"], "3x10@60kg");
    }

    #[tokio::test]
    async fn sessions_filtered_by_user_and_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        for (user, volume) in [("U1", 1.0), ("U2", 2.0), ("U1", 3.0)] {
            store
                .insert_session(NewWorkoutSession {
                    user_id: user.into(),
                    total_volume: volume,
                    exercises: serde_json::json!("deadlift"),
                })
                .await
                .unwrap();
        }

        let rows = store.list_sessions("U1").await.unwrap();
        let volumes: Vec<f64> = rows.iter().map(|r| r.total_volume).collect();
        assert_eq!(volumes, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn nutrition_roundtrip_keeps_extra_nutrients() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut extra = serde_json::Map::new();
        extra.insert("creatine".into(), serde_json::json!(5));

        store
            .insert_nutrition(NewNutritionEntry {
                user_id: "U1".into(),
                carbs: 250.0,
                protein: 180.0,
                fat: 70.0,
                extra,
            })
            .await
            .unwrap();

        let rows = store.list_nutrition("U1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].protein, 180.0);
        assert_eq!(rows[0].extra["creatine"], 5);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("liftlog.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).await.unwrap();
            store
                .insert_session(NewWorkoutSession {
                    user_id: "U1".into(),
                    total_volume: 42.0,
                    exercises: serde_json::json!([]),
                })
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(path).await.unwrap();
        assert_eq!(reopened.list_sessions("U1").await.unwrap().len(), 1);
    }
}
