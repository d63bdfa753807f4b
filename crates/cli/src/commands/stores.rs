//! Store wiring shared by the commands.

use std::sync::Arc;

use affinity_config::{AppConfig, MemoryBackendKind};
use affinity_core::memory::{EpisodicStore, FactStore};
use affinity_core::store::DurableStore;
use affinity_memory::{InMemoryEpisodicStore, InMemoryFactStore, NoopDurableStore, SqliteDurableStore, SqliteMemoryStore};

/// Persistent backends selected by `[memory] backend`.
pub struct Stores {
    pub durable: Arc<dyn DurableStore>,
    pub episodic: Arc<dyn EpisodicStore>,
    pub facts: Arc<dyn FactStore>,
    /// `false` when nothing outlives the process.
    pub persistent: bool,
}

pub async fn open(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.memory.backend {
        MemoryBackendKind::Sqlite => {
            let path = config.memory.resolved_database_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let pool = affinity_memory::connect(&path.to_string_lossy()).await?;
            let memory = Arc::new(SqliteMemoryStore::from_pool(pool.clone()).await?);
            let durable = Arc::new(SqliteDurableStore::from_pool(pool).await?);
            tracing::debug!(path = %path.display(), "Opened SQLite stores");
            Ok(Stores {
                durable,
                episodic: memory.clone(),
                facts: memory,
                persistent: true,
            })
        }
        MemoryBackendKind::InMemory => Ok(Stores {
            durable: Arc::new(NoopDurableStore),
            episodic: Arc::new(InMemoryEpisodicStore::new()),
            facts: Arc::new(InMemoryFactStore::new()),
            persistent: false,
        }),
    }
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
