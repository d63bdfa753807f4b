//! SQLite episodic memory with FTS5 full-text search, plus user facts.
//!
//! Tables:
//! - `episodes`: stored exchanges, owned by a (user, companion) pair
//! - `episodes_fts`: FTS5 virtual table for ranked keyword search (BM25)
//! - `user_facts`: one row per (user, companion, fact key)
//!
//! Triggers keep the FTS index in sync on insert/delete.

use std::str::FromStr;

use affinity_core::error::MemoryError;
use affinity_core::memory::{EpisodicStore, FactMap, FactStore, MemoryFilter, MemoryRecord};
use affinity_core::relationship::RelationshipKey;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Open (creating if missing) a SQLite pool.
///
/// Pass `"sqlite::memory:"` for an in-process ephemeral database.
pub async fn connect(path: &str) -> Result<SqlitePool, MemoryError> {
    let options = SqliteConnectOptions::from_str(path)
        .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    // Each connection to `:memory:` is its own database.
    let max_connections = if path.contains(":memory:") { 1 } else { 4 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))
}

/// Episodic memory and user facts in one SQLite database.
pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

impl SqliteMemoryStore {
    /// Open the database at `path` and create the schema.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let pool = connect(path).await?;
        let store = Self::from_pool(pool).await?;
        info!("SQLite memory store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (shared with the durable store).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                user_id      TEXT NOT NULL,
                companion_id TEXT NOT NULL,
                kind         TEXT NOT NULL DEFAULT 'conversation',
                emotion      TEXT,
                content      TEXT NOT NULL,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("episodes table: {e}")))?;

        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS episodes_fts USING fts5(
                content,
                content='episodes',
                content_rowid='iid',
                tokenize='porter unicode61'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("FTS5 table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS episodes_ai AFTER INSERT ON episodes BEGIN
                INSERT INTO episodes_fts(rowid, content) VALUES (new.iid, new.content);
            END
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("insert trigger: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS episodes_ad AFTER DELETE ON episodes BEGIN
                INSERT INTO episodes_fts(episodes_fts, rowid, content)
                VALUES ('delete', old.iid, old.content);
            END
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("delete trigger: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_episodes_owner ON episodes(user_id, companion_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("owner index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_facts (
                user_id      TEXT NOT NULL,
                companion_id TEXT NOT NULL,
                fact_key     TEXT NOT NULL,
                fact_value   TEXT NOT NULL,
                updated_at   TEXT NOT NULL,
                PRIMARY KEY (user_id, companion_id, fact_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("user_facts table: {e}")))?;

        debug!("SQLite memory migrations complete");
        Ok(())
    }

    /// Build a safe FTS5 query from user text.
    ///
    /// Each word is stripped to alphanumerics, quoted, and prefix-matched;
    /// words are OR-ed so any shared topic can recall an episode.
    fn sanitize_fts_query(text: &str) -> String {
        text.split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphanumeric() || *c == '_')
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .map(|w| format!("\"{w}\"*"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

#[async_trait]
impl EpisodicStore for SqliteMemoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store(&self, mut record: MemoryRecord) -> Result<String, MemoryError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            r#"
            INSERT INTO episodes (id, user_id, companion_id, kind, emotion, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.metadata.user_id)
        .bind(&record.metadata.companion_id)
        .bind(record.metadata.kind.as_str())
        .bind(&record.metadata.emotion)
        .bind(&record.content)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        debug!(id = %record.id, "Stored episode");
        Ok(record.id)
    }

    async fn query(&self, text: &str, k: usize, filter: &MemoryFilter) -> Result<Vec<String>, MemoryError> {
        let fts_query = Self::sanitize_fts_query(text);
        if fts_query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        // bm25() is lower-is-better
        let rows = sqlx::query(
            r#"
            SELECT e.content, bm25(episodes_fts) AS rank
            FROM episodes_fts f
            JOIN episodes e ON e.iid = f.rowid
            WHERE episodes_fts MATCH ?1
              AND (?2 IS NULL OR e.user_id = ?2)
              AND (?3 IS NULL OR e.companion_id = ?3)
            ORDER BY rank, e.iid DESC
            LIMIT ?4
            "#,
        )
        .bind(&fts_query)
        .bind(&filter.user_id)
        .bind(&filter.companion_id)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("FTS5 search: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("content")
                    .map_err(|e| MemoryError::QueryFailed(format!("content column: {e}")))
            })
            .collect()
    }

    async fn count(&self, filter: &MemoryFilter) -> Result<usize, MemoryError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt FROM episodes
            WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR companion_id = ?2)
            "#,
        )
        .bind(&filter.user_id)
        .bind(&filter.companion_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }
}

#[async_trait]
impl FactStore for SqliteMemoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_facts(&self, key: &RelationshipKey) -> Result<FactMap, MemoryError> {
        let rows = sqlx::query(
            "SELECT fact_key, fact_value FROM user_facts WHERE user_id = ?1 AND companion_id = ?2",
        )
        .bind(&key.user_id)
        .bind(&key.companion_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("facts: {e}")))?;

        rows.iter()
            .map(|row| {
                let k: String = row
                    .try_get("fact_key")
                    .map_err(|e| MemoryError::QueryFailed(format!("fact_key column: {e}")))?;
                let v: String = row
                    .try_get("fact_value")
                    .map_err(|e| MemoryError::QueryFailed(format!("fact_value column: {e}")))?;
                Ok((k, v))
            })
            .collect()
    }

    async fn merge_facts(&self, key: &RelationshipKey, facts: FactMap) -> Result<(), MemoryError> {
        if facts.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("BEGIN failed: {e}")))?;

        for (fact_key, fact_value) in &facts {
            sqlx::query(
                r#"
                INSERT INTO user_facts (user_id, companion_id, fact_key, fact_value, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, companion_id, fact_key) DO UPDATE SET
                    fact_value = excluded.fact_value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&key.user_id)
            .bind(&key.companion_id)
            .bind(fact_key)
            .bind(fact_value)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("fact upsert failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(user = %key.user_id, count = facts.len(), "Merged user facts");
        Ok(())
    }
}
