//! The turn pipeline.
//!
//! One user message runs through these stages in order:
//!
//! ```text
//! load state ─▶ recall memory ─▶ analyze ─▶ protect + resolve level
//!     ─▶ commit state (fast store, then durable mirror) ─▶ expression
//!     ─▶ compose prompt ─▶ generate ─▶ remember ─▶ hooks ─▶ reply
//! ```
//!
//! # Consistency
//!
//! The [`StateStore`] is authoritative. State is committed there before the
//! reply is generated, and a failed generation does not roll it back. The
//! [`DurableStore`] is a best-effort mirror: its writes are logged on failure
//! and never fail the turn, so it may lag the fast store.
//!
//! There is no per-relationship lock. Two concurrent turns for the same pair
//! may both read the same state and the later write wins.

use std::sync::Arc;
use std::time::Duration;

use affinity_config::{AppConfig, CompanionConfig, EngineConfig, PipelineStrategy};
use affinity_core::analysis::{EmotionAnalysis, Sentiment};
use affinity_core::event::{AffinityEvent, EventBus};
use affinity_core::level::{LEVEL_DOWN_MESSAGE, Level};
use affinity_core::memory::MemoryRecord;
use affinity_core::message::{Message, Role, SessionId, truncate_chars};
use affinity_core::provider::{Provider, ProviderRequest};
use affinity_core::relationship::{RelationshipKey, RelationshipState};
use affinity_core::store::{DurableStore, EmotionLogRecord, HistoryRecord, StateStore};
use affinity_memory::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregator::{MemoryAggregator, MemoryContext};
use crate::analyzer::SentimentAnalyzer;
use crate::expression::{EmotionExpression, synthesize};
use crate::extraction::FactExtractor;
use crate::prompt::{ClassicInput, ComposedPrompt, FlowInput, PromptBuilder, build_classic_prompt};
use crate::protector::{HistorySummary, ProtectionResult, ProtectorRegistry, Trend, milestone_bonus};

/// Messages rendered into the working-memory section.
const WORKING_MEMORY_MESSAGES: usize = 10;

/// Longest message excerpt in the working-memory section.
const WORKING_MEMORY_CHARS: usize = 100;

// ── Request / response ────────────────────────────────────────────────────

/// One incoming user message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub companion_id: String,
    pub session_id: SessionId,
    pub message: String,
}

impl TurnRequest {
    pub fn new(
        user_id: impl Into<String>,
        companion_id: impl Into<String>,
        session_id: SessionId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            companion_id: companion_id.into(),
            session_id,
            message: message.into(),
        }
    }

    pub fn key(&self) -> RelationshipKey {
        RelationshipKey::new(&self.user_id, &self.companion_id)
    }
}

/// What the caller gets back. Never an error.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub reply: String,
    pub companion_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<TurnDebug>,
}

/// Internals of a turn, exposed only when `engine.debug` is on.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDebug {
    pub analysis: EmotionAnalysis,
    pub protection: ProtectionResult,
    pub old_score: i32,
    pub new_score: i32,
    pub old_level: Level,
    pub new_level: Level,
    pub trend: Trend,
    /// Changes buffered for this relationship in this process
    pub recent_changes: HistorySummary,
    pub recovery_suggestion: Option<&'static str>,
    pub expression: Option<EmotionExpression>,
    pub memory: MemoryContext,
    pub prompt: String,
    pub skipped_sections: Vec<String>,
    pub generated: bool,
}

/// A completed turn, handed to every [`TurnHook`].
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub key: RelationshipKey,
    pub session_id: SessionId,
    pub user_message: String,
    pub reply: String,
    /// `false` when the fallback reply was sent.
    pub generated: bool,
    pub analysis: EmotionAnalysis,
    pub protection: ProtectionResult,
    pub old_level: Level,
    pub new_level: Level,
    pub state: RelationshipState,
}

/// Post-turn callback. Failures are logged and otherwise ignored.
#[async_trait]
pub trait TurnHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_turn(&self, outcome: &TurnOutcome) -> affinity_core::Result<()>;
}

// ── Coordinator ───────────────────────────────────────────────────────────

/// Runs turns. Cheap to share behind an `Arc`; holds no per-turn state.
pub struct ResponseCoordinator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    companion: CompanionConfig,
    engine: EngineConfig,
    milestone_bonuses: bool,
    prompt_builder: PromptBuilder,
    states: Arc<dyn StateStore>,
    durable: Arc<dyn DurableStore>,
    sessions: SessionStore,
    memory: Arc<MemoryAggregator>,
    analyzer: SentimentAnalyzer,
    protectors: Arc<ProtectorRegistry>,
    extractor: Option<FactExtractor>,
    event_bus: Arc<EventBus>,
    hooks: Vec<Arc<dyn TurnHook>>,
}

impl ResponseCoordinator {
    /// Wire a coordinator from configuration. Analysis, generation, and fact
    /// extraction all go through `provider`.
    pub fn new(
        provider: Arc<dyn Provider>,
        config: &AppConfig,
        states: Arc<dyn StateStore>,
        durable: Arc<dyn DurableStore>,
        sessions: SessionStore,
        memory: MemoryAggregator,
    ) -> Self {
        let engine = config.engine.clone();
        let analyzer = SentimentAnalyzer::new(provider.clone(), &config.default_model)
            .with_temperature(engine.analysis_temperature)
            .with_timeout(Duration::from_secs(engine.analysis_timeout_secs));
        let extractor = engine.extract_facts.then(|| {
            FactExtractor::new(provider.clone(), &config.default_model)
                .with_timeout(Duration::from_secs(engine.analysis_timeout_secs))
        });

        Self {
            provider,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            companion: config.companion.clone(),
            milestone_bonuses: config.protector.milestone_bonuses,
            prompt_builder: PromptBuilder::new(config.prompt.max_chars),
            states,
            durable,
            sessions,
            memory: Arc::new(memory),
            analyzer,
            protectors: Arc::new(ProtectorRegistry::new(config.protector.clone())),
            extractor,
            event_bus: Arc::new(EventBus::default()),
            hooks: Vec::new(),
            engine,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn TurnHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Replace (or with `None`, disable) fact extraction.
    pub fn with_fact_extractor(mut self, extractor: Option<FactExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_analyzer(mut self, analyzer: SentimentAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Share a protector registry between coordinators.
    pub fn with_protectors(mut self, protectors: Arc<ProtectorRegistry>) -> Self {
        self.protectors = protectors;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.engine.debug = debug;
        self
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn memory(&self) -> &MemoryAggregator {
        &self.memory
    }

    pub fn protectors(&self) -> &ProtectorRegistry {
        &self.protectors
    }

    pub fn companion_name(&self) -> &str {
        &self.companion.name
    }

    /// Process one user message end to end.
    pub async fn respond(&self, request: TurnRequest) -> TurnResponse {
        let key = request.key();
        info!(key = %key, session = %request.session_id, chars = request.message.chars().count(), "Turn started");

        // ── 1. Load ──
        let mut state = match self.states.get_state(&key).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(key = %key, "First contact, using neutral state");
                RelationshipState::new(key.clone())
            }
            Err(e) => {
                error!(key = %key, store = self.states.name(), error = %e, "State read failed");
                return self.fallback_response();
            }
        };

        // ── 2. Recall ──
        let memory = self.memory.aggregate(&key, &request.message).await;

        // ── 3. Analyze ──
        let analysis = self.analyzer.analyze(&request.message, &state, &self.companion.name).await;

        // ── 4. Protect and resolve ──
        let old_score = state.affinity_score;
        let old_level = state.level();
        let bonus = if self.milestone_bonuses {
            milestone_bonus(state.total_interactions, state.total_interactions + 1)
        } else {
            0
        };
        let raw_delta = analysis.suggested_affinity_change + bonus;
        let reason = format!("{}_{}", analysis.primary_emotion.as_str(), analysis.user_intent.as_str());
        let (protection, trend) = self.protectors.protect(&key, old_score, raw_delta, &reason).await;

        state.apply_deltas(
            protection.adjusted_change,
            analysis.suggested_trust_change,
            analysis.suggested_tension_change,
        );
        state.record_interaction(protection.adjusted_change);
        state.mood = next_mood(analysis.primary_emotion, &state.mood);
        let new_level = state.level();

        info!(
            key = %key,
            raw = raw_delta,
            bonus,
            adjusted = protection.adjusted_change,
            reason = protection.reason.as_str(),
            score = state.affinity_score,
            level = new_level.key(),
            "Affinity updated"
        );

        // ── 5. Commit ──
        if let Err(e) = self.states.set_state(&state).await {
            error!(key = %key, store = self.states.name(), error = %e, "State write failed");
            return self.fallback_response();
        }
        self.mirror(&state, old_score, old_level, &analysis, &protection, &reason, &request.message)
            .await;
        self.publish_changes(&key, old_score, old_level, &state, &reason);

        // ── 6-7. Expression and prompt ──
        let window = self.sessions.recent(&request.session_id, self.sessions.capacity()).await;
        let working_memory = render_working_memory(&window);
        let special = match new_level.cmp(&old_level) {
            std::cmp::Ordering::Greater => Some(new_level.level_up_message()),
            std::cmp::Ordering::Less => Some(LEVEL_DOWN_MESSAGE),
            std::cmp::Ordering::Equal => None,
        };

        let (composed, expression) = match self.engine.pipeline {
            PipelineStrategy::Flow => {
                let expression = synthesize(&analysis, new_level, state.trust_score, state.tension_score, &state.mood);
                let composed = self.prompt_builder.build(&FlowInput {
                    companion_name: &self.companion.name,
                    persona: Some(&self.companion.persona),
                    state: &state,
                    analysis: &analysis,
                    expression: &expression,
                    working_memory: (!working_memory.is_empty()).then_some(working_memory.as_str()),
                    episodic: memory.episodic.as_deref(),
                    facts: memory.facts.as_ref(),
                    special_instructions: special,
                });
                (composed, Some(expression))
            }
            PipelineStrategy::Classic => {
                let text = build_classic_prompt(&ClassicInput {
                    companion_name: &self.companion.name,
                    persona: Some(&self.companion.persona),
                    state: &state,
                    analysis: &analysis,
                    episodic: memory.episodic.as_deref(),
                    facts: memory.facts.as_ref(),
                });
                let composed = ComposedPrompt {
                    text,
                    included: vec!["classic".into()],
                    skipped: Vec::new(),
                };
                (composed, None)
            }
        };

        // ── 8. Generate ──
        let history_start = window.len().saturating_sub(self.engine.history_messages);
        let mut messages = Vec::with_capacity(self.engine.history_messages + 2);
        messages.push(Message::system(&composed.text));
        messages.extend(window[history_start..].iter().cloned());
        messages.push(Message::user(&request.message));

        let (reply, generated) = match self.generate(messages).await {
            Ok(text) => (text, true),
            Err(e) => {
                error!(key = %key, error = %e, "Generation failed, sending fallback reply");
                self.event_bus.publish(AffinityEvent::GenerationFailed {
                    key: key.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                (self.engine.fallback_reply.clone(), false)
            }
        };

        // ── 9. Remember ──
        self.sessions
            .append(
                &request.session_id,
                [Message::user(&request.message), Message::assistant(&reply)],
            )
            .await;

        if analysis.is_memorable {
            self.remember_turn(&mut state, &analysis, &request.message, &reply).await;
        }

        if generated {
            if let Some(extractor) = &self.extractor {
                let turn_text = format!("User: {}\nCompanion: {}", request.message, reply);
                if let Some(facts) = extractor.extract(&turn_text).await {
                    match self.memory.learn(&key, facts).await {
                        Ok(()) => debug!(key = %key, "Facts merged"),
                        Err(e) => warn!(key = %key, error = %e, "Fact merge failed"),
                    }
                }
            }
        }

        let outcome = TurnOutcome {
            key: key.clone(),
            session_id: request.session_id.clone(),
            user_message: request.message.clone(),
            reply: reply.clone(),
            generated,
            analysis: analysis.clone(),
            protection: protection.clone(),
            old_level,
            new_level,
            state: state.clone(),
        };
        self.run_hooks(&outcome).await;

        // ── 10. Reply ──
        let recent_changes = if self.engine.debug {
            self.protectors.history_summary(&key).await
        } else {
            HistorySummary::default()
        };
        let debug = self.engine.debug.then(|| TurnDebug {
            analysis,
            protection,
            old_score,
            new_score: state.affinity_score,
            old_level,
            new_level,
            trend,
            recent_changes,
            recovery_suggestion: self.protectors.recovery_suggestion(state.affinity_score),
            expression,
            memory,
            prompt: composed.text,
            skipped_sections: composed.skipped,
            generated,
        });

        info!(key = %key, generated, level = new_level.key(), "Turn complete");

        TurnResponse {
            reply,
            companion_name: self.companion.name.clone(),
            debug,
        }
    }

    fn fallback_response(&self) -> TurnResponse {
        TurnResponse {
            reply: self.engine.fallback_reply.clone(),
            companion_name: self.companion.name.clone(),
            debug: None,
        }
    }

    async fn generate(&self, messages: Vec<Message>) -> affinity_core::Result<String> {
        let request = ProviderRequest::new(&self.model, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let timeout = Duration::from_secs(self.engine.generation_timeout_secs);

        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                affinity_core::ProviderError::Timeout(format!("generation exceeded {}s", timeout.as_secs()))
            })??;
        Ok(response.into_text()?)
    }

    /// Mirror the committed state into the durable store.
    #[allow(clippy::too_many_arguments)]
    async fn mirror(
        &self,
        state: &RelationshipState,
        old_score: i32,
        old_level: Level,
        analysis: &EmotionAnalysis,
        protection: &ProtectionResult,
        reason: &str,
        message: &str,
    ) {
        let key = &state.key;
        let store = self.durable.name();

        if let Err(e) = self.durable.upsert_relationship(state).await {
            warn!(key = %key, store, error = %e, "Durable upsert failed");
        }

        if protection.adjusted_change != 0 {
            let record =
                HistoryRecord::affinity_change(key.clone(), old_score, state.affinity_score, protection.reason.as_str())
                    .with_context(reason);
            if let Err(e) = self.durable.append_history(record).await {
                warn!(key = %key, store, error = %e, "History append failed");
            }
        }

        let new_level = state.level();
        if new_level != old_level {
            let record = HistoryRecord::level_change(key.clone(), old_level, new_level, protection.adjusted_change);
            if let Err(e) = self.durable.append_history(record).await {
                warn!(key = %key, store, error = %e, "Level history append failed");
            }
        }

        let log = EmotionLogRecord {
            key: key.clone(),
            emotion: analysis.primary_emotion.as_str().to_string(),
            intensity: EmotionLogRecord::intensity_percent(analysis.intensity),
            intent: analysis.user_intent.as_str().to_string(),
            affinity_delta: protection.adjusted_change,
            trust_delta: analysis.suggested_trust_change,
            tension_delta: analysis.suggested_tension_change,
            is_memorable: analysis.is_memorable,
            is_appropriate: analysis.is_appropriate,
            message_summary: EmotionLogRecord::summarize(message),
            created_at: Utc::now(),
        };
        if let Err(e) = self.durable.append_emotion_log(log).await {
            warn!(key = %key, store, error = %e, "Emotion log append failed");
        }
    }

    fn publish_changes(
        &self,
        key: &RelationshipKey,
        old_score: i32,
        old_level: Level,
        state: &RelationshipState,
        reason: &str,
    ) {
        let now = Utc::now();
        if state.affinity_score != old_score {
            self.event_bus.publish(AffinityEvent::AffinityChanged {
                key: key.clone(),
                old_score,
                new_score: state.affinity_score,
                delta: state.affinity_score - old_score,
                reason: reason.to_string(),
                timestamp: now,
            });
        }
        let new_level = state.level();
        if new_level != old_level {
            info!(key = %key, from = old_level.key(), to = new_level.key(), "Level changed");
            self.event_bus.publish(AffinityEvent::LevelChanged {
                key: key.clone(),
                old_level,
                new_level,
                timestamp: now,
            });
        }
    }

    async fn remember_turn(&self, state: &mut RelationshipState, analysis: &EmotionAnalysis, message: &str, reply: &str) {
        let key = state.key.clone();
        let record = MemoryRecord::conversation(&key, format!("User: {message}\nCompanion: {reply}"))
            .with_emotion(analysis.primary_emotion.as_str());
        match self.memory.remember(record).await {
            Ok(id) => debug!(key = %key, memory_id = %id, "Stored episodic memory"),
            Err(e) => warn!(key = %key, error = %e, "Episodic store failed"),
        }

        if analysis.key_points.is_empty() {
            return;
        }
        for point in &analysis.key_points {
            state.remember(point.clone());
        }
        if let Err(e) = self.states.set_state(state).await {
            warn!(key = %key, error = %e, "Saving key points failed");
            return;
        }
        if let Err(e) = self.durable.upsert_relationship(state).await {
            warn!(key = %key, store = self.durable.name(), error = %e, "Durable key point upsert failed");
        }
    }

    async fn run_hooks(&self, outcome: &TurnOutcome) {
        if self.hooks.is_empty() {
            return;
        }
        let results = futures::future::join_all(self.hooks.iter().map(|h| h.after_turn(outcome))).await;
        for (hook, result) in self.hooks.iter().zip(results) {
            if let Err(e) = result {
                warn!(hook = hook.name(), error = %e, "Turn hook failed");
            }
        }
    }
}

/// Mood after a message of the given polarity.
pub fn next_mood(sentiment: Sentiment, current: &str) -> String {
    match sentiment {
        Sentiment::Positive => "happy".into(),
        Sentiment::Negative => "sad".into(),
        Sentiment::Romantic => "shy".into(),
        Sentiment::Neutral => current.to_string(),
    }
}

/// The last user and companion messages of a session as `User:`/`You:`
/// lines. Other roles never take one of the ten slots.
pub fn render_working_memory(messages: &[Message]) -> String {
    let mut lines: Vec<String> = messages
        .iter()
        .rev()
        .filter_map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "You",
                _ => return None,
            };
            Some(format!("{speaker}: {}", truncate_chars(&m.content, WORKING_MEMORY_CHARS)))
        })
        .take(WORKING_MEMORY_MESSAGES)
        .collect();
    lines.reverse();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingEpisodicStore, FailingStateStore, SequentialMockProvider, analysis_json};
    use affinity_core::store::ChangeType;
    use affinity_memory::{InMemoryEpisodicStore, InMemoryFactStore, InMemoryStateStore, NoopDurableStore};
    use std::sync::Mutex;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.engine.extract_facts = false;
        config
    }

    struct Fixture {
        provider: Arc<SequentialMockProvider>,
        states: Arc<InMemoryStateStore>,
        coordinator: ResponseCoordinator,
    }

    fn fixture(replies: &[&str], config: AppConfig) -> Fixture {
        let provider = Arc::new(SequentialMockProvider::texts(replies));
        let states = Arc::new(InMemoryStateStore::new());
        let memory = MemoryAggregator::new(Arc::new(InMemoryEpisodicStore::new()), Arc::new(InMemoryFactStore::new()));
        let coordinator = ResponseCoordinator::new(
            provider.clone(),
            &config,
            states.clone(),
            Arc::new(NoopDurableStore),
            SessionStore::new(config.memory.working_capacity),
            memory,
        );
        Fixture {
            provider,
            states,
            coordinator,
        }
    }

    fn request(message: &str) -> TurnRequest {
        TurnRequest::new("u1", "aria", SessionId::from("s1"), message)
    }

    #[tokio::test]
    async fn first_turn_creates_state_and_replies() {
        let analysis = analysis_json("positive", "greeting", 5, false);
        let f = fixture(&[&analysis, "Hello there!"], config());

        let response = f.coordinator.respond(request("hi!")).await;
        assert_eq!(response.reply, "Hello there!");
        assert_eq!(response.companion_name, "Aria");
        assert!(response.debug.is_none());

        let state = f.states.get_state(&RelationshipKey::new("u1", "aria")).await.unwrap().unwrap();
        // 50 is in the acceleration zone: 5 * 1.3 = 6
        assert_eq!(state.affinity_score, 56);
        assert_eq!(state.mood, "happy");
        assert_eq!(state.total_interactions, 1);
        assert_eq!(f.provider.call_count(), 2);
    }

    #[tokio::test]
    async fn generation_request_shape() {
        let analysis = analysis_json("neutral", "question", 0, false);
        let f = fixture(&[&analysis, "first", &analysis, "second"], config());
        f.coordinator.respond(request("one")).await;
        f.coordinator.respond(request("two")).await;

        let generation = f.provider.request(3);
        assert_eq!(generation.messages.len(), 4);
        assert_eq!(generation.messages[0].role, Role::System);
        assert!(generation.messages[0].content.starts_with("# Identity"));
        assert_eq!(generation.messages[1].content, "one");
        assert_eq!(generation.messages[2].content, "first");
        assert_eq!(generation.messages[3].content, "two");
    }

    #[tokio::test]
    async fn classic_pipeline_uses_single_block() {
        let mut cfg = config();
        cfg.engine.pipeline = PipelineStrategy::Classic;
        cfg.engine.debug = true;
        let analysis = analysis_json("neutral", "question", 0, false);
        let f = fixture(&[&analysis, "ok"], cfg);

        let response = f.coordinator.respond(request("what's up")).await;
        let debug = response.debug.unwrap();
        assert!(debug.expression.is_none());
        assert!(debug.prompt.starts_with("You are Aria"));
    }

    #[tokio::test]
    async fn state_read_failure_returns_fallback() {
        let cfg = config();
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let coordinator = ResponseCoordinator::new(
            provider.clone(),
            &cfg,
            Arc::new(FailingStateStore),
            Arc::new(NoopDurableStore),
            SessionStore::new(10),
            MemoryAggregator::new(Arc::new(InMemoryEpisodicStore::new()), Arc::new(InMemoryFactStore::new())),
        );
        let response = coordinator.respond(request("hi")).await;
        assert_eq!(response.reply, cfg.engine.fallback_reply);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn episodic_failure_does_not_fail_turn() {
        let mut cfg = config();
        cfg.engine.debug = true;
        let analysis = analysis_json("positive", "sharing", 3, true);
        let provider = Arc::new(SequentialMockProvider::texts(&[&analysis, "nice!"]));
        let coordinator = ResponseCoordinator::new(
            provider,
            &cfg,
            Arc::new(InMemoryStateStore::new()),
            Arc::new(NoopDurableStore),
            SessionStore::new(10),
            MemoryAggregator::new(Arc::new(FailingEpisodicStore), Arc::new(InMemoryFactStore::new())),
        );
        let response = coordinator.respond(request("I ran a marathon")).await;
        assert_eq!(response.reply, "nice!");
        let debug = response.debug.unwrap();
        assert!(debug.memory.episodic.is_none());
        assert!(!debug.prompt.contains("# Shared memories"));
    }

    #[tokio::test]
    async fn memorable_turn_keeps_key_points() {
        let analysis = analysis_json("positive", "sharing", 3, true);
        let f = fixture(&[&analysis, "Congrats!"], config());
        f.coordinator.respond(request("I got the job")).await;

        let state = f.states.get_state(&RelationshipKey::new("u1", "aria")).await.unwrap().unwrap();
        assert_eq!(state.memories, vec!["talked about their day".to_string()]);
        let summary = f.coordinator.memory().summary(&state.key).await.unwrap();
        assert_eq!(summary.episodic_count, 1);
    }

    #[tokio::test]
    async fn facts_extracted_after_generation() {
        let mut cfg = AppConfig::default();
        cfg.engine.extract_facts = true;
        let analysis = analysis_json("neutral", "sharing", 1, false);
        let f = fixture(&[&analysis, "Nice to meet you, Sam!", r#"{"name": "Sam"}"#], cfg);
        f.coordinator.respond(request("I'm Sam")).await;

        let summary = f.coordinator.memory().summary(&RelationshipKey::new("u1", "aria")).await.unwrap();
        assert_eq!(summary.facts.get("name").map(String::as_str), Some("Sam"));
        assert_eq!(f.provider.call_count(), 3);
    }

    struct RecordingHook {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TurnHook for RecordingHook {
        fn name(&self) -> &str {
            "recording"
        }

        async fn after_turn(&self, outcome: &TurnOutcome) -> affinity_core::Result<()> {
            self.seen.lock().unwrap().push(outcome.reply.clone());
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl TurnHook for FailingHook {
        fn name(&self) -> &str {
            "failing"
        }

        async fn after_turn(&self, _outcome: &TurnOutcome) -> affinity_core::Result<()> {
            Err(affinity_core::Error::Internal("hook broke".into()))
        }
    }

    #[tokio::test]
    async fn hooks_run_and_failures_are_ignored() {
        let analysis = analysis_json("neutral", "greeting", 0, false);
        let hook = Arc::new(RecordingHook { seen: Mutex::new(Vec::new()) });
        let f = fixture(&[&analysis, "hey"], config());
        let coordinator = f.coordinator.with_hook(Arc::new(FailingHook)).with_hook(hook.clone());

        let response = coordinator.respond(request("yo")).await;
        assert_eq!(response.reply, "hey");
        assert_eq!(*hook.seen.lock().unwrap(), vec!["hey".to_string()]);
    }

    #[tokio::test]
    async fn events_published_on_change() {
        let analysis = analysis_json("positive", "compliment", 40, false);
        let mut state = RelationshipState::new(RelationshipKey::new("u1", "aria"));
        state.affinity_score = 90;
        let f = fixture(&[&analysis, "thank you!"], config());
        f.states.set_state(&state).await.unwrap();
        let mut rx = f.coordinator.event_bus().subscribe();

        f.coordinator.respond(request("you're great")).await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(&*first, AffinityEvent::AffinityChanged { delta: 52, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            &*second,
            AffinityEvent::LevelChanged {
                old_level: Level::Stranger,
                new_level: Level::Acquaintance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn milestone_bonus_flows_through_protection() {
        let analysis = analysis_json("neutral", "sharing", 0, false);
        let mut state = RelationshipState::new(RelationshipKey::new("u1", "aria"));
        state.affinity_score = 500;
        state.total_interactions = 9;
        let f = fixture(&[&analysis, "ok"], config());
        f.states.set_state(&state).await.unwrap();

        f.coordinator.respond(request("hello again")).await;
        let after = f.states.get_state(&state.key).await.unwrap().unwrap();
        assert_eq!(after.affinity_score, 505);
        assert_eq!(after.total_interactions, 10);
    }

    #[test]
    fn mood_follows_sentiment() {
        assert_eq!(next_mood(Sentiment::Positive, "neutral"), "happy");
        assert_eq!(next_mood(Sentiment::Negative, "happy"), "sad");
        assert_eq!(next_mood(Sentiment::Romantic, "sad"), "shy");
        assert_eq!(next_mood(Sentiment::Neutral, "sad"), "sad");
    }

    #[test]
    fn working_memory_rendering() {
        let long = "x".repeat(150);
        let mut messages = vec![Message::system("ignored")];
        for i in 0..6 {
            messages.push(Message::user(format!("u{i}")));
            messages.push(Message::assistant(format!("a{i}")));
        }
        messages.push(Message::user(long));

        let text = render_working_memory(&messages);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "You: a1");
        assert_eq!(lines[1], "User: u2");
        assert_eq!(lines[9].chars().count(), "User: ".len() + 100);
    }

    #[test]
    fn working_memory_skips_other_roles_without_losing_slots() {
        let mut messages = Vec::new();
        for i in 0..5 {
            messages.push(Message::user(format!("u{i}")));
            messages.push(Message::system("note"));
            messages.push(Message::assistant(format!("a{i}")));
        }

        let text = render_working_memory(&messages);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "User: u0");
        assert_eq!(lines[9], "You: a4");
        assert!(!text.contains("note"));
        assert_eq!(render_working_memory(&[Message::system("only")]), "");
    }

    #[tokio::test]
    async fn level_change_history_written() {
        use affinity_memory::SqliteDurableStore;

        let durable = Arc::new(SqliteDurableStore::new("sqlite::memory:").await.unwrap());
        let analysis = analysis_json("positive", "compliment", 40, false);
        let provider = Arc::new(SequentialMockProvider::texts(&[&analysis, "aw"]));
        let states = Arc::new(InMemoryStateStore::new());
        let mut state = RelationshipState::new(RelationshipKey::new("u1", "aria"));
        state.affinity_score = 90;
        states.set_state(&state).await.unwrap();

        let coordinator = ResponseCoordinator::new(
            provider,
            &config(),
            states,
            durable.clone(),
            SessionStore::new(10),
            MemoryAggregator::new(Arc::new(InMemoryEpisodicStore::new()), Arc::new(InMemoryFactStore::new())),
        );
        coordinator.respond(request("you're wonderful")).await;

        let history = durable.recent_history(&state.key, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change_type, ChangeType::LevelChange);
        assert_eq!(history[0].new_value, "acquaintance");
        assert_eq!(history[1].change_type, ChangeType::AffinityChange);
        assert_eq!(history[1].delta, 52);
        assert_eq!(history[1].reason, "acceleration");
        assert_eq!(history[1].context.as_deref(), Some("positive_compliment"));
    }

    #[tokio::test]
    async fn key_points_reach_durable_store() {
        use affinity_memory::SqliteDurableStore;

        let durable = Arc::new(SqliteDurableStore::new("sqlite::memory:").await.unwrap());
        let analysis = analysis_json("positive", "sharing", 3, true);
        let provider = Arc::new(SequentialMockProvider::texts(&[&analysis, "Congrats!"]));
        let coordinator = ResponseCoordinator::new(
            provider,
            &config(),
            Arc::new(InMemoryStateStore::new()),
            durable.clone(),
            SessionStore::new(10),
            MemoryAggregator::new(Arc::new(InMemoryEpisodicStore::new()), Arc::new(InMemoryFactStore::new())),
        );
        coordinator.respond(request("I got the job")).await;

        // A fresh process seeds its fast store from this row.
        let stored = durable
            .load_relationship(&RelationshipKey::new("u1", "aria"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.memories, vec!["talked about their day".to_string()]);
        assert_eq!(stored.total_interactions, 1);
    }
}
