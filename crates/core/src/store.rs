//! Relationship persistence traits.
//!
//! Two stores back a relationship. The `StateStore` is the fast, authoritative
//! copy read and written on every turn. The `DurableStore` is a secondary
//! mirror with history and emotion logs; writes to it are best-effort and
//! may lag or be lost without affecting the turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::level::Level;
use crate::message::truncate_chars;
use crate::relationship::{RelationshipKey, RelationshipState};

/// Longest message summary kept in an emotion log row.
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Kind of a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    LevelChange,
    AffinityChange,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::LevelChange => "level_change",
            ChangeType::AffinityChange => "affinity_change",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "level_change" => Some(ChangeType::LevelChange),
            "affinity_change" => Some(ChangeType::AffinityChange),
            _ => None,
        }
    }
}

/// One row of relationship history.
///
/// For affinity changes `old_value`/`new_value` are scores; for level changes
/// they are level keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub key: RelationshipKey,
    pub change_type: ChangeType,
    pub old_value: String,
    pub new_value: String,
    pub delta: i32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn affinity_change(
        key: RelationshipKey,
        old_score: i32,
        new_score: i32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key,
            change_type: ChangeType::AffinityChange,
            old_value: old_score.to_string(),
            new_value: new_score.to_string(),
            delta: new_score - old_score,
            reason: reason.into(),
            context: None,
            created_at: Utc::now(),
        }
    }

    pub fn level_change(key: RelationshipKey, old: Level, new: Level, delta: i32) -> Self {
        let direction = if new > old { "up" } else { "down" };
        Self {
            key,
            change_type: ChangeType::LevelChange,
            old_value: old.key().to_string(),
            new_value: new.key().to_string(),
            delta,
            reason: format!("level_{direction}"),
            context: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// One row of the per-turn emotion log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionLogRecord {
    pub key: RelationshipKey,
    pub emotion: String,
    /// 0..=100
    pub intensity: u8,
    pub intent: String,
    pub affinity_delta: i32,
    pub trust_delta: i32,
    pub tension_delta: i32,
    pub is_memorable: bool,
    pub is_appropriate: bool,
    pub message_summary: String,
    pub created_at: DateTime<Utc>,
}

impl EmotionLogRecord {
    /// Convert a 0.0..=1.0 intensity into the 0..=100 stored form.
    pub fn intensity_percent(intensity: f64) -> u8 {
        (intensity.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Cut a message down to the stored summary length.
    pub fn summarize(message: &str) -> String {
        truncate_chars(message, MAX_SUMMARY_CHARS).to_string()
    }
}

/// The fast, authoritative relationship store.
#[async_trait]
pub trait StateStore: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the relationship has never been seen.
    async fn get_state(&self, key: &RelationshipKey)
    -> std::result::Result<Option<RelationshipState>, StateError>;

    async fn set_state(&self, state: &RelationshipState) -> std::result::Result<(), StateError>;
}

/// The durable secondary store (relationship rows, history, emotion logs).
#[async_trait]
pub trait DurableStore: Send + Sync {
    fn name(&self) -> &str;

    async fn upsert_relationship(&self, state: &RelationshipState) -> std::result::Result<(), StateError>;

    async fn append_history(&self, record: HistoryRecord) -> std::result::Result<(), StateError>;

    async fn append_emotion_log(&self, record: EmotionLogRecord) -> std::result::Result<(), StateError>;

    async fn load_relationship(
        &self,
        key: &RelationshipKey,
    ) -> std::result::Result<Option<RelationshipState>, StateError>;

    /// Most recent history rows first.
    async fn recent_history(
        &self,
        key: &RelationshipKey,
        limit: usize,
    ) -> std::result::Result<Vec<HistoryRecord>, StateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RelationshipKey {
        RelationshipKey::new("u1", "c1")
    }

    #[test]
    fn affinity_change_record_computes_delta() {
        let rec = HistoryRecord::affinity_change(key(), 90, 142, "acceleration");
        assert_eq!(rec.change_type, ChangeType::AffinityChange);
        assert_eq!(rec.delta, 52);
        assert_eq!(rec.old_value, "90");
        assert_eq!(rec.new_value, "142");
    }

    #[test]
    fn level_change_record_uses_level_keys() {
        let rec = HistoryRecord::level_change(key(), Level::Stranger, Level::Acquaintance, 52)
            .with_context("first real chat");
        assert_eq!(rec.old_value, "stranger");
        assert_eq!(rec.new_value, "acquaintance");
        assert_eq!(rec.reason, "level_up");
        assert_eq!(rec.context.as_deref(), Some("first real chat"));
    }

    #[test]
    fn change_type_string_forms() {
        for ct in [ChangeType::LevelChange, ChangeType::AffinityChange] {
            assert_eq!(ChangeType::parse(ct.as_str()), Some(ct));
        }
        assert_eq!(ChangeType::parse("mood_change"), None);
    }

    #[test]
    fn emotion_log_helpers() {
        assert_eq!(EmotionLogRecord::intensity_percent(0.756), 76);
        assert_eq!(EmotionLogRecord::intensity_percent(4.0), 100);
        let long = "x".repeat(900);
        assert_eq!(EmotionLogRecord::summarize(&long).chars().count(), MAX_SUMMARY_CHARS);
    }
}
