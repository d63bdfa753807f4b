//! Sentiment and intent analysis of a user message.
//!
//! One generation call per turn asks for a JSON reading of the message in the
//! context of the relationship. The reply is parsed leniently; anything that
//! goes wrong yields [`EmotionAnalysis::neutral`] instead of an error.

use std::sync::Arc;
use std::time::Duration;

use affinity_core::analysis::EmotionAnalysis;
use affinity_core::error::{Error, ProviderError};
use affinity_core::message::Message;
use affinity_core::provider::{Provider, ProviderRequest};
use affinity_core::relationship::RelationshipState;
use tracing::{debug, warn};

/// Pull the JSON payload out of a model reply.
///
/// Tries a ```` ```json ```` fence, then any ```` ``` ```` fence, then the
/// span from the first `{` to the last `}`, and finally the raw text.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return &text[start..=end];
        }
    }
    text.trim()
}

/// Reads a user message through the generation provider.
pub struct SentimentAnalyzer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl SentimentAnalyzer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyze `message` as sent to `companion_name` in the given relationship.
    ///
    /// Never fails: provider errors, timeouts, empty replies, and unparseable
    /// JSON all produce the neutral reading.
    pub async fn analyze(&self, message: &str, state: &RelationshipState, companion_name: &str) -> EmotionAnalysis {
        match self.try_analyze(message, state, companion_name).await {
            Ok(analysis) => {
                debug!(
                    emotion = analysis.primary_emotion.as_str(),
                    intensity = analysis.intensity,
                    suggested = analysis.suggested_affinity_change,
                    "Message analyzed"
                );
                analysis
            }
            Err(e) => {
                warn!(user = %state.key.user_id, error = %e, "Analysis failed, using neutral reading");
                EmotionAnalysis::neutral()
            }
        }
    }

    async fn try_analyze(
        &self,
        message: &str,
        state: &RelationshipState,
        companion_name: &str,
    ) -> affinity_core::Result<EmotionAnalysis> {
        let prompt = build_analysis_prompt(message, state, companion_name);
        let request = ProviderRequest::new(&self.model, vec![Message::user(prompt)])
            .with_temperature(self.temperature);

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| ProviderError::Timeout(format!("analysis exceeded {}s", self.timeout.as_secs())))??;

        let text = response.into_text()?;
        let value: serde_json::Value = serde_json::from_str(extract_json_block(&text))?;
        EmotionAnalysis::from_json_value(&value)
            .ok_or_else(|| Error::Internal("analysis reply is not a JSON object".into()))
    }
}

/// The extraction instruction for one message.
pub fn build_analysis_prompt(message: &str, state: &RelationshipState, companion_name: &str) -> String {
    let level = state.level();
    let profile = level.profile();

    format!(
        r#"You are an emotion analyst. Analyze the following message a user sent to the companion "{companion_name}".

[Relationship]
- Level: {level_name} ({description})
- Affinity: {score}/1000
- Intimacy: {intimacy}/10
- Companion mood: {mood}

[Message]
"{message}"

[Task]
Return one JSON object with these fields:
1. primary_emotion: positive | negative | neutral | romantic
2. emotion_intensity: number from 0 to 1
3. detected_emotions: specific emotions, e.g. joy, gratitude, excitement, affection, love, longing, sadness, disappointment, curiosity
4. user_intent: greeting | sharing | question | compliment | complaint | request | confession
5. is_appropriate: whether the intimacy of the message fits the current level (saying "I love you, babe" to a stranger does not)
6. violation_reason: short reason when not appropriate, else ""
7. suggested_affinity_change: integer from -50 to 50
8. suggested_trust_change: integer from -10 to 10
9. suggested_tension_change: integer from -10 to 10
10. key_points: one to three short phrases
11. is_memorable: whether the message is worth remembering long term

[Output]
Only the JSON, for example:
```json
{{
  "primary_emotion": "positive",
  "emotion_intensity": 0.8,
  "detected_emotions": ["joy", "gratitude"],
  "user_intent": "sharing",
  "is_appropriate": true,
  "violation_reason": "",
  "suggested_affinity_change": 8,
  "suggested_trust_change": 2,
  "suggested_tension_change": 0,
  "key_points": ["shared good news"],
  "is_memorable": true
}}
```"#,
        level_name = level.display_name(),
        description = profile.description,
        score = state.affinity_score,
        intimacy = profile.intimacy,
        mood = state.mood,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, HangingProvider, SequentialMockProvider};
    use affinity_core::analysis::{Sentiment, UserIntent};
    use affinity_core::relationship::RelationshipKey;

    fn state() -> RelationshipState {
        RelationshipState::new(RelationshipKey::new("u1", "c1"))
    }

    #[test]
    fn extracts_json_fence() {
        let text = "Sure!\n```json\n{\"a\": 1}\n```\nDone";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn extracts_plain_fence() {
        let text = "```\n{\"a\": 2}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 2}");
    }

    #[test]
    fn extracts_brace_span() {
        let text = "Here you go: {\"a\": {\"b\": 3}} hope that helps";
        assert_eq!(extract_json_block(text), "{\"a\": {\"b\": 3}}");
    }

    #[test]
    fn falls_back_to_raw_text() {
        assert_eq!(extract_json_block("  no json here "), "no json here");
    }

    #[test]
    fn prompt_carries_relationship_context() {
        let prompt = build_analysis_prompt("hi there", &state(), "Aria");
        assert!(prompt.contains("\"Aria\""));
        assert!(prompt.contains("Stranger"));
        assert!(prompt.contains("50/1000"));
        assert!(prompt.contains("suggested_tension_change"));
    }

    #[tokio::test]
    async fn parses_fenced_reply() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "```json\n{\"primary_emotion\": \"romantic\", \"emotion_intensity\": 0.9, \"user_intent\": \"confession\", \"suggested_affinity_change\": 30, \"is_memorable\": true}\n```",
        ]));
        let analyzer = SentimentAnalyzer::new(provider.clone(), "mock");
        let a = analyzer.analyze("I really like you", &state(), "Aria").await;

        assert_eq!(a.primary_emotion, Sentiment::Romantic);
        assert_eq!(a.user_intent, UserIntent::Confession);
        assert_eq!(a.suggested_affinity_change, 30);
        assert!(a.is_memorable);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn garbage_reply_is_neutral() {
        let provider = Arc::new(SequentialMockProvider::texts(&["I feel like this message is nice"]));
        let analyzer = SentimentAnalyzer::new(provider, "mock");
        assert_eq!(analyzer.analyze("hey", &state(), "Aria").await, EmotionAnalysis::neutral());
    }

    #[tokio::test]
    async fn provider_error_is_neutral() {
        let analyzer = SentimentAnalyzer::new(Arc::new(FailingProvider), "mock");
        assert_eq!(analyzer.analyze("hey", &state(), "Aria").await, EmotionAnalysis::neutral());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_neutral() {
        let analyzer = SentimentAnalyzer::new(Arc::new(HangingProvider), "mock")
            .with_timeout(Duration::from_secs(1));
        assert_eq!(analyzer.analyze("hey", &state(), "Aria").await, EmotionAnalysis::neutral());
    }
}
