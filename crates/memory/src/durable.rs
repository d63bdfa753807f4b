//! SQLite durable mirror of relationship state.
//!
//! Tables:
//! - `relationships`: latest state per (user, companion)
//! - `relationship_history`: level and affinity changes
//! - `emotion_logs`: one row per analyzed turn
//!
//! The fast state store stays authoritative; this copy exists for reporting
//! and recovery, and every write here is best-effort from the engine's view.

use affinity_core::error::StateError;
use affinity_core::level::Level;
use affinity_core::relationship::{RelationshipKey, RelationshipState};
use affinity_core::store::{ChangeType, DurableStore, EmotionLogRecord, HistoryRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::sqlite::connect;

/// Relationship rows, history, and emotion logs in SQLite.
pub struct SqliteDurableStore {
    pool: SqlitePool,
}

fn storage(context: &str) -> impl Fn(sqlx::Error) -> StateError + '_ {
    move |e| StateError::Storage(format!("{context}: {e}"))
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteDurableStore {
    pub async fn new(path: &str) -> Result<Self, StateError> {
        let pool = connect(path)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        let store = Self::from_pool(pool).await?;
        info!("SQLite durable store initialized at {path}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StateError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS relationships (
                user_id               TEXT NOT NULL,
                companion_id          TEXT NOT NULL,
                affinity_score        INTEGER NOT NULL,
                current_level         TEXT NOT NULL,
                trust_score           INTEGER NOT NULL,
                tension_score         INTEGER NOT NULL,
                mood                  TEXT NOT NULL,
                total_interactions    INTEGER NOT NULL DEFAULT 0,
                positive_interactions INTEGER NOT NULL DEFAULT 0,
                negative_interactions INTEGER NOT NULL DEFAULT 0,
                memories              TEXT NOT NULL DEFAULT '[]',
                created_at            TEXT NOT NULL,
                updated_at            TEXT NOT NULL,
                last_interaction_at   TEXT,
                PRIMARY KEY (user_id, companion_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage("relationships table"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS relationship_history (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      TEXT NOT NULL,
                companion_id TEXT NOT NULL,
                change_type  TEXT NOT NULL,
                old_value    TEXT NOT NULL,
                new_value    TEXT NOT NULL,
                delta        INTEGER NOT NULL,
                reason       TEXT NOT NULL,
                context      TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage("relationship_history table"))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_owner ON relationship_history(user_id, companion_id, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage("history index"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emotion_logs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL,
                companion_id    TEXT NOT NULL,
                emotion         TEXT NOT NULL,
                intensity       INTEGER NOT NULL,
                intent          TEXT NOT NULL,
                affinity_delta  INTEGER NOT NULL,
                trust_delta     INTEGER NOT NULL,
                tension_delta   INTEGER NOT NULL,
                is_memorable    INTEGER NOT NULL,
                is_appropriate  INTEGER NOT NULL,
                message_summary TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage("emotion_logs table"))?;

        debug!("SQLite durable migrations complete");
        Ok(())
    }

    /// Number of emotion log rows for a relationship.
    pub async fn emotion_log_count(&self, key: &RelationshipKey) -> Result<usize, StateError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM emotion_logs WHERE user_id = ?1 AND companion_id = ?2",
        )
        .bind(&key.user_id)
        .bind(&key.companion_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("emotion log count"))?;

        let cnt: i64 = row.try_get("cnt").map_err(storage("cnt column"))?;
        Ok(cnt as usize)
    }

    fn row_to_state(row: &SqliteRow) -> Result<RelationshipState, StateError> {
        let get_i64 = |col: &str| -> Result<i64, StateError> {
            row.try_get(col)
                .map_err(|e| StateError::Storage(format!("{col} column: {e}")))
        };
        let get_str = |col: &str| -> Result<String, StateError> {
            row.try_get(col)
                .map_err(|e| StateError::Storage(format!("{col} column: {e}")))
        };

        let memories_json = get_str("memories")?;
        let last_interaction: Option<String> = row
            .try_get("last_interaction_at")
            .map_err(storage("last_interaction_at column"))?;

        Ok(RelationshipState {
            key: RelationshipKey::new(get_str("user_id")?, get_str("companion_id")?),
            affinity_score: get_i64("affinity_score")? as i32,
            trust_score: get_i64("trust_score")? as i32,
            tension_score: get_i64("tension_score")? as i32,
            mood: get_str("mood")?,
            total_interactions: get_i64("total_interactions")? as u64,
            positive_interactions: get_i64("positive_interactions")? as u64,
            negative_interactions: get_i64("negative_interactions")? as u64,
            memories: serde_json::from_str(&memories_json).unwrap_or_default(),
            created_at: parse_time(&get_str("created_at")?),
            updated_at: parse_time(&get_str("updated_at")?),
            last_interaction_at: last_interaction.as_deref().map(parse_time),
        })
    }

    fn row_to_history(row: &SqliteRow) -> Result<HistoryRecord, StateError> {
        let change_type: String = row.try_get("change_type").map_err(storage("change_type column"))?;
        let change_type = ChangeType::parse(&change_type)
            .ok_or_else(|| StateError::Storage(format!("unknown change_type '{change_type}'")))?;
        let delta: i64 = row.try_get("delta").map_err(storage("delta column"))?;
        let created_at: String = row.try_get("created_at").map_err(storage("created_at column"))?;

        Ok(HistoryRecord {
            key: RelationshipKey::new(
                row.try_get::<String, _>("user_id").map_err(storage("user_id column"))?,
                row.try_get::<String, _>("companion_id").map_err(storage("companion_id column"))?,
            ),
            change_type,
            old_value: row.try_get("old_value").map_err(storage("old_value column"))?,
            new_value: row.try_get("new_value").map_err(storage("new_value column"))?,
            delta: delta as i32,
            reason: row.try_get("reason").map_err(storage("reason column"))?,
            context: row.try_get("context").map_err(storage("context column"))?,
            created_at: parse_time(&created_at),
        })
    }
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert_relationship(&self, state: &RelationshipState) -> Result<(), StateError> {
        let memories = serde_json::to_string(&state.memories)
            .map_err(|e| StateError::Storage(format!("memories serialization: {e}")))?;
        let level: Level = state.level();

        sqlx::query(
            r#"
            INSERT INTO relationships (
                user_id, companion_id, affinity_score, current_level, trust_score, tension_score,
                mood, total_interactions, positive_interactions, negative_interactions, memories,
                created_at, updated_at, last_interaction_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(user_id, companion_id) DO UPDATE SET
                affinity_score = excluded.affinity_score,
                current_level = excluded.current_level,
                trust_score = excluded.trust_score,
                tension_score = excluded.tension_score,
                mood = excluded.mood,
                total_interactions = excluded.total_interactions,
                positive_interactions = excluded.positive_interactions,
                negative_interactions = excluded.negative_interactions,
                memories = excluded.memories,
                updated_at = excluded.updated_at,
                last_interaction_at = excluded.last_interaction_at
            "#,
        )
        .bind(&state.key.user_id)
        .bind(&state.key.companion_id)
        .bind(state.affinity_score)
        .bind(level.key())
        .bind(state.trust_score)
        .bind(state.tension_score)
        .bind(&state.mood)
        .bind(state.total_interactions as i64)
        .bind(state.positive_interactions as i64)
        .bind(state.negative_interactions as i64)
        .bind(&memories)
        .bind(state.created_at.to_rfc3339())
        .bind(state.updated_at.to_rfc3339())
        .bind(state.last_interaction_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(storage("relationship upsert"))?;

        Ok(())
    }

    async fn append_history(&self, record: HistoryRecord) -> Result<(), StateError> {
        sqlx::query(
            r#"
            INSERT INTO relationship_history
                (user_id, companion_id, change_type, old_value, new_value, delta, reason, context, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.key.user_id)
        .bind(&record.key.companion_id)
        .bind(record.change_type.as_str())
        .bind(&record.old_value)
        .bind(&record.new_value)
        .bind(record.delta)
        .bind(&record.reason)
        .bind(&record.context)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage("history insert"))?;

        Ok(())
    }

    async fn append_emotion_log(&self, record: EmotionLogRecord) -> Result<(), StateError> {
        sqlx::query(
            r#"
            INSERT INTO emotion_logs
                (user_id, companion_id, emotion, intensity, intent, affinity_delta, trust_delta,
                 tension_delta, is_memorable, is_appropriate, message_summary, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&record.key.user_id)
        .bind(&record.key.companion_id)
        .bind(&record.emotion)
        .bind(i64::from(record.intensity))
        .bind(&record.intent)
        .bind(record.affinity_delta)
        .bind(record.trust_delta)
        .bind(record.tension_delta)
        .bind(record.is_memorable)
        .bind(record.is_appropriate)
        .bind(EmotionLogRecord::summarize(&record.message_summary))
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage("emotion log insert"))?;

        Ok(())
    }

    async fn load_relationship(&self, key: &RelationshipKey) -> Result<Option<RelationshipState>, StateError> {
        let row = sqlx::query("SELECT * FROM relationships WHERE user_id = ?1 AND companion_id = ?2")
            .bind(&key.user_id)
            .bind(&key.companion_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("relationship load"))?;

        row.as_ref().map(Self::row_to_state).transpose()
    }

    async fn recent_history(&self, key: &RelationshipKey, limit: usize) -> Result<Vec<HistoryRecord>, StateError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM relationship_history
            WHERE user_id = ?1 AND companion_id = ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )
        .bind(&key.user_id)
        .bind(&key.companion_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("history query"))?;

        rows.iter().map(Self::row_to_history).collect()
    }
}
