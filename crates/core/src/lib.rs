//! # Affinity Core
//!
//! Domain types, traits, and error definitions for the affinity engine.
//! This crate has **zero framework dependencies**: it defines the
//! relationship model and the collaborator traits that the other crates
//! implement against.
//!
//! ## Layout
//!
//! - [`level`]: the seven relationship bands and their behaviour profiles
//! - [`relationship`]: per-(user, companion) state
//! - [`analysis`]: the structured reading of a user message
//! - [`provider`], [`store`], [`memory`]: collaborator traits
//! - [`event`]: post-commit notifications

pub mod analysis;
pub mod error;
pub mod event;
pub mod level;
pub mod memory;
pub mod message;
pub mod provider;
pub mod relationship;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use analysis::{EmotionAnalysis, Sentiment, UserIntent};
pub use error::{Error, MemoryError, ProviderError, Result, StateError};
pub use event::{AffinityEvent, EventBus};
pub use level::{Level, LevelBand, LevelProfile, ResponseRules};
pub use memory::{EpisodicStore, FactMap, FactStore, MemoryFilter, MemoryRecord};
pub use message::{Message, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use relationship::{RelationshipKey, RelationshipState};
pub use store::{ChangeType, DurableStore, EmotionLogRecord, HistoryRecord, StateStore};
