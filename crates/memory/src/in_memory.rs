//! In-memory stores: useful for testing and ephemeral sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use affinity_core::error::{MemoryError, StateError};
use affinity_core::memory::{EpisodicStore, FactMap, FactStore, MemoryFilter, MemoryRecord};
use affinity_core::relationship::{RelationshipKey, RelationshipState};
use affinity_core::store::StateStore;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Relationship state held in a map. The default fast store.
#[derive(Default)]
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<RelationshipKey, RelationshipState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_state(&self, key: &RelationshipKey) -> Result<Option<RelationshipState>, StateError> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn set_state(&self, state: &RelationshipState) -> Result<(), StateError> {
        self.states
            .write()
            .await
            .insert(state.key.clone(), state.clone());
        Ok(())
    }
}

/// Episodic records in a Vec, ranked by keyword overlap.
#[derive(Default)]
pub struct InMemoryEpisodicStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryEpisodicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lowercased alphanumeric words of `text`.
fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl EpisodicStore for InMemoryEpisodicStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, mut record: MemoryRecord) -> Result<String, MemoryError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn query(&self, text: &str, k: usize, filter: &MemoryFilter) -> Result<Vec<String>, MemoryError> {
        let query_words = keywords(text);
        if query_words.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        let mut scored: Vec<(usize, &MemoryRecord)> = records
            .iter()
            .filter(|r| r.belongs_to(filter))
            .filter_map(|r| {
                let overlap = keywords(&r.content).intersection(&query_words).count();
                (overlap > 0).then_some((overlap, r))
            })
            .collect();

        // Best overlap first, newest first among ties
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.created_at.cmp(&a.1.created_at)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, r)| r.content.clone())
            .collect())
    }

    async fn count(&self, filter: &MemoryFilter) -> Result<usize, MemoryError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.belongs_to(filter))
            .count())
    }
}

/// User facts in a map of maps.
#[derive(Default)]
pub struct InMemoryFactStore {
    facts: Arc<RwLock<HashMap<RelationshipKey, FactMap>>>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_facts(&self, key: &RelationshipKey) -> Result<FactMap, MemoryError> {
        Ok(self.facts.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn merge_facts(&self, key: &RelationshipKey, facts: FactMap) -> Result<(), MemoryError> {
        if facts.is_empty() {
            return Ok(());
        }
        self.facts
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .extend(facts);
        Ok(())
    }
}
