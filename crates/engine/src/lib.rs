//! The affinity turn pipeline.
//!
//! Each user message goes through one **analyze → protect → express → generate**
//! pass:
//!
//! 1. **Analyze** the message for emotion, intent, and a suggested affinity change
//! 2. **Protect** the change against bursts, zones, and the score bounds
//! 3. **Resolve** the relationship level and commit the new state
//! 4. **Express**: turn emotion and level into concrete speaking guidance
//! 5. **Compose** a budgeted system instruction and generate the reply
//!
//! [`ResponseCoordinator`] drives the whole pass; the other modules are the
//! stages it calls.

pub mod aggregator;
pub mod analyzer;
pub mod coordinator;
pub mod expression;
pub mod extraction;
pub mod prompt;
pub mod protector;

#[cfg(test)]
mod test_helpers;

pub use aggregator::{MemoryAggregator, MemoryContext, MemorySummary};
pub use analyzer::SentimentAnalyzer;
pub use coordinator::{ResponseCoordinator, TurnDebug, TurnHook, TurnOutcome, TurnRequest, TurnResponse};
pub use expression::{EmotionCategory, EmotionExpression, EmotionKind, IntensityLevel, synthesize};
pub use extraction::FactExtractor;
pub use prompt::{ComposedPrompt, PromptBuilder, PromptComposer, PromptSection};
pub use protector::{AffinityProtector, HistorySummary, ProtectionReason, ProtectionResult, ProtectorRegistry, Trend};
