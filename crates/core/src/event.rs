//! Relationship events.
//!
//! Published by the coordinator after a turn commits its new state. Anything
//! interested (notification pushers, analytics) subscribes without the engine
//! knowing about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::level::Level;
use crate::relationship::RelationshipKey;

/// Everything the engine announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AffinityEvent {
    /// The affinity score moved
    AffinityChanged {
        key: RelationshipKey,
        old_score: i32,
        new_score: i32,
        delta: i32,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The score crossed a band boundary
    LevelChanged {
        key: RelationshipKey,
        old_level: Level,
        new_level: Level,
        timestamp: DateTime<Utc>,
    },

    /// Generation failed and the fallback reply was sent
    GenerationFailed {
        key: RelationshipKey,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AffinityEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AffinityEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AffinityEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(AffinityEvent::LevelChanged {
            key: RelationshipKey::new("u1", "c1"),
            old_level: Level::Stranger,
            new_level: Level::Acquaintance,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            AffinityEvent::LevelChanged { new_level, .. } => {
                assert_eq!(*new_level, Level::Acquaintance);
            }
            _ => panic!("Expected LevelChanged event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(AffinityEvent::GenerationFailed {
            key: RelationshipKey::new("u1", "c1"),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
