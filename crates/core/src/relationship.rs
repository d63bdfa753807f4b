//! Relationship state between one user and one companion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::{Level, MAX_SCORE, MIN_SCORE};

/// Upper bound on trust and tension.
pub const MAX_SUBSCORE: i32 = 100;

/// How many short memories a relationship keeps inline.
pub const MAX_STATE_MEMORIES: usize = 20;

/// Key of a relationship: the (user, companion) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub user_id: String,
    pub companion_id: String,
}

impl RelationshipKey {
    pub fn new(user_id: impl Into<String>, companion_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            companion_id: companion_id.into(),
        }
    }
}

impl std::fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.companion_id)
    }
}

/// The mutable state of one relationship.
///
/// There is deliberately no `level` field: the level is always derived from
/// `affinity_score` through [`RelationshipState::level`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipState {
    pub key: RelationshipKey,

    /// 0..=1000
    pub affinity_score: i32,

    /// 0..=100
    pub trust_score: i32,

    /// 0..=100
    pub tension_score: i32,

    /// Free-form mood tag ("neutral", "happy", ...)
    pub mood: String,

    pub total_interactions: u64,
    pub positive_interactions: u64,
    pub negative_interactions: u64,

    /// Short notes worth keeping with the relationship itself, newest last.
    #[serde(default)]
    pub memories: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_at: Option<DateTime<Utc>>,
}

impl RelationshipState {
    /// Neutral first-contact state.
    pub fn new(key: RelationshipKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            affinity_score: 50,
            trust_score: 10,
            tension_score: 0,
            mood: "neutral".into(),
            total_interactions: 0,
            positive_interactions: 0,
            negative_interactions: 0,
            memories: Vec::new(),
            created_at: now,
            updated_at: now,
            last_interaction_at: None,
        }
    }

    /// The current level, freshly resolved from the score.
    pub fn level(&self) -> Level {
        Level::resolve(self.affinity_score)
    }

    /// Apply an already-protected affinity delta plus raw trust/tension
    /// deltas, clamping every score into its legal range.
    pub fn apply_deltas(&mut self, affinity: i32, trust: i32, tension: i32) {
        self.affinity_score = (self.affinity_score + affinity).clamp(MIN_SCORE, MAX_SCORE);
        self.trust_score = (self.trust_score + trust).clamp(0, MAX_SUBSCORE);
        self.tension_score = (self.tension_score + tension).clamp(0, MAX_SUBSCORE);
        self.updated_at = Utc::now();
    }

    /// Count one interaction, classified by the sign of its affinity delta.
    pub fn record_interaction(&mut self, affinity_delta: i32) {
        self.total_interactions += 1;
        if affinity_delta > 0 {
            self.positive_interactions += 1;
        } else if affinity_delta < 0 {
            self.negative_interactions += 1;
        }
        self.last_interaction_at = Some(Utc::now());
    }

    /// Keep a short note, evicting the oldest beyond the cap.
    pub fn remember(&mut self, note: impl Into<String>) {
        self.memories.push(note.into());
        if self.memories.len() > MAX_STATE_MEMORIES {
            let overflow = self.memories.len() - MAX_STATE_MEMORIES;
            self.memories.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RelationshipKey {
        RelationshipKey::new("u1", "c1")
    }

    #[test]
    fn first_contact_defaults() {
        let state = RelationshipState::new(key());
        assert_eq!(state.affinity_score, 50);
        assert_eq!(state.trust_score, 10);
        assert_eq!(state.tension_score, 0);
        assert_eq!(state.mood, "neutral");
        assert_eq!(state.level(), Level::Stranger);
    }

    #[test]
    fn level_follows_score() {
        let mut state = RelationshipState::new(key());
        state.apply_deltas(100, 0, 0);
        assert_eq!(state.affinity_score, 150);
        assert_eq!(state.level(), Level::Acquaintance);
    }

    #[test]
    fn deltas_are_clamped() {
        let mut state = RelationshipState::new(key());
        state.apply_deltas(-500, -50, 500);
        assert_eq!(state.affinity_score, 0);
        assert_eq!(state.trust_score, 0);
        assert_eq!(state.tension_score, 100);
    }

    #[test]
    fn interaction_counters() {
        let mut state = RelationshipState::new(key());
        state.record_interaction(5);
        state.record_interaction(-3);
        state.record_interaction(0);
        assert_eq!(state.total_interactions, 3);
        assert_eq!(state.positive_interactions, 1);
        assert_eq!(state.negative_interactions, 1);
        assert!(state.last_interaction_at.is_some());
    }

    #[test]
    fn memories_are_bounded() {
        let mut state = RelationshipState::new(key());
        for i in 0..(MAX_STATE_MEMORIES + 5) {
            state.remember(format!("note {i}"));
        }
        assert_eq!(state.memories.len(), MAX_STATE_MEMORIES);
        assert_eq!(state.memories[0], "note 5");
    }

    #[test]
    fn serialized_state_has_no_level_field() {
        let state = RelationshipState::new(key());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("level").is_none());
        assert_eq!(json["key"]["user_id"], "u1");
    }
}
