//! Shared test doubles for engine tests.

use std::sync::Mutex;

use affinity_core::error::{MemoryError, ProviderError, StateError};
use affinity_core::memory::{EpisodicStore, MemoryFilter, MemoryRecord};
use affinity_core::message::Message;
use affinity_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use affinity_core::relationship::{RelationshipKey, RelationshipState};
use affinity_core::store::StateStore;

/// A mock provider that returns scripted replies in sequence and records
/// every request it receives.
///
/// Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{index}, have {})",
                responses.len()
            );
        }
        requests.push(request);
        responses[index].clone()
    }
}

/// Always fails with an API error.
pub struct FailingProvider;

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "boom".into(),
        })
    }
}

/// Never answers.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Episodic store whose every call fails.
pub struct FailingEpisodicStore;

#[async_trait::async_trait]
impl EpisodicStore for FailingEpisodicStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn store(&self, _record: MemoryRecord) -> Result<String, MemoryError> {
        Err(MemoryError::Storage("disk on fire".into()))
    }

    async fn query(&self, _text: &str, _k: usize, _filter: &MemoryFilter) -> Result<Vec<String>, MemoryError> {
        Err(MemoryError::QueryFailed("index unavailable".into()))
    }

    async fn count(&self, _filter: &MemoryFilter) -> Result<usize, MemoryError> {
        Err(MemoryError::QueryFailed("index unavailable".into()))
    }
}

/// Episodic store that never answers a query.
pub struct HangingEpisodicStore;

#[async_trait::async_trait]
impl EpisodicStore for HangingEpisodicStore {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn store(&self, _record: MemoryRecord) -> Result<String, MemoryError> {
        std::future::pending().await
    }

    async fn query(&self, _text: &str, _k: usize, _filter: &MemoryFilter) -> Result<Vec<String>, MemoryError> {
        std::future::pending().await
    }

    async fn count(&self, _filter: &MemoryFilter) -> Result<usize, MemoryError> {
        std::future::pending().await
    }
}

/// State store that is down.
pub struct FailingStateStore;

#[async_trait::async_trait]
impl StateStore for FailingStateStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get_state(&self, _key: &RelationshipKey) -> Result<Option<RelationshipState>, StateError> {
        Err(StateError::Unavailable("connection refused".into()))
    }

    async fn set_state(&self, _state: &RelationshipState) -> Result<(), StateError> {
        Err(StateError::Unavailable("connection refused".into()))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A JSON analysis reply with the given sentiment, intent, and suggestion.
pub fn analysis_json(emotion: &str, intent: &str, affinity: i32, memorable: bool) -> String {
    serde_json::json!({
        "primary_emotion": emotion,
        "emotion_intensity": 0.6,
        "detected_emotions": [],
        "user_intent": intent,
        "is_appropriate": true,
        "violation_reason": "",
        "suggested_affinity_change": affinity,
        "suggested_trust_change": 1,
        "suggested_tension_change": 0,
        "key_points": ["talked about their day"],
        "is_memorable": memorable
    })
    .to_string()
}
