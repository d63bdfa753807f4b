//! Long-term memory traits: episodic recall (L2) and user facts (L3).
//!
//! Working memory (L1) is a concrete in-process service and lives in the
//! memory crate; only the tiers with swappable backends are traits here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::relationship::RelationshipKey;

/// Known facts about a user, keyed by fact name ("name", "occupation", ...).
pub type FactMap = BTreeMap<String, String>;

/// What kind of episode a record holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    #[default]
    Conversation,
    Milestone,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Conversation => "conversation",
            MemoryKind::Milestone => "milestone",
        }
    }
}

/// Ownership and tagging of an episodic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub user_id: String,
    pub companion_id: String,
    #[serde(default)]
    pub kind: MemoryKind,
    #[serde(default)]
    pub emotion: Option<String>,
}

/// One episodic memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub metadata: MemoryMetadata,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn conversation(key: &RelationshipKey, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            metadata: MemoryMetadata {
                user_id: key.user_id.clone(),
                companion_id: key.companion_id.clone(),
                kind: MemoryKind::Conversation,
                emotion: None,
            },
            created_at: Utc::now(),
        }
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.metadata.emotion = Some(emotion.into());
        self
    }

    pub fn belongs_to(&self, filter: &MemoryFilter) -> bool {
        filter.user_id.as_deref().is_none_or(|u| u == self.metadata.user_id)
            && filter
                .companion_id
                .as_deref()
                .is_none_or(|c| c == self.metadata.companion_id)
    }
}

/// Restricts an episodic query to one user and/or companion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryFilter {
    pub user_id: Option<String>,
    pub companion_id: Option<String>,
}

impl MemoryFilter {
    pub fn for_key(key: &RelationshipKey) -> Self {
        Self {
            user_id: Some(key.user_id.clone()),
            companion_id: Some(key.companion_id.clone()),
        }
    }
}

/// Episodic memory (L2): past exchanges recalled by relevance.
#[async_trait]
pub trait EpisodicStore: Send + Sync {
    fn name(&self) -> &str;

    /// Store a record, returning its id.
    async fn store(&self, record: MemoryRecord) -> std::result::Result<String, MemoryError>;

    /// Up to `k` record contents most relevant to `text`, best first.
    async fn query(
        &self,
        text: &str,
        k: usize,
        filter: &MemoryFilter,
    ) -> std::result::Result<Vec<String>, MemoryError>;

    async fn count(&self, filter: &MemoryFilter) -> std::result::Result<usize, MemoryError>;
}

/// Semantic facts (L3) about a user, per companion.
#[async_trait]
pub trait FactStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get_facts(&self, key: &RelationshipKey) -> std::result::Result<FactMap, MemoryError>;

    /// Merge `facts` into what is already known. Later values win.
    async fn merge_facts(
        &self,
        key: &RelationshipKey,
        facts: FactMap,
    ) -> std::result::Result<(), MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_owner_only() {
        let rec = MemoryRecord::conversation(&RelationshipKey::new("u1", "c1"), "hello");
        assert!(rec.belongs_to(&MemoryFilter::for_key(&RelationshipKey::new("u1", "c1"))));
        assert!(!rec.belongs_to(&MemoryFilter::for_key(&RelationshipKey::new("u2", "c1"))));
        assert!(!rec.belongs_to(&MemoryFilter::for_key(&RelationshipKey::new("u1", "c9"))));
        assert!(rec.belongs_to(&MemoryFilter::default()));
    }

    #[test]
    fn record_serialization() {
        let rec = MemoryRecord::conversation(&RelationshipKey::new("u1", "c1"), "User: hi")
            .with_emotion("positive");
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"conversation\""));
        assert!(json.contains("positive"));
    }
}
