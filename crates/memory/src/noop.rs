//! No-op durable store: disables the relationship mirror entirely.

use affinity_core::error::StateError;
use affinity_core::relationship::{RelationshipKey, RelationshipState};
use affinity_core::store::{DurableStore, EmotionLogRecord, HistoryRecord};
use async_trait::async_trait;

/// A durable store that keeps nothing.
pub struct NoopDurableStore;

#[async_trait]
impl DurableStore for NoopDurableStore {
    fn name(&self) -> &str { "none" }

    async fn upsert_relationship(&self, _state: &RelationshipState) -> Result<(), StateError> {
        Ok(())
    }

    async fn append_history(&self, _record: HistoryRecord) -> Result<(), StateError> {
        Ok(())
    }

    async fn append_emotion_log(&self, _record: EmotionLogRecord) -> Result<(), StateError> {
        Ok(())
    }

    async fn load_relationship(&self, _key: &RelationshipKey) -> Result<Option<RelationshipState>, StateError> {
        Ok(None)
    }

    async fn recent_history(&self, _key: &RelationshipKey, _limit: usize) -> Result<Vec<HistoryRecord>, StateError> {
        Ok(Vec::new())
    }
}
