//! Fact extraction for semantic memory (L3).

use std::sync::Arc;
use std::time::Duration;

use affinity_core::memory::FactMap;
use affinity_core::message::Message;
use affinity_core::provider::{Provider, ProviderRequest};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analyzer::extract_json_block;

/// Longest fact value kept.
const MAX_FACT_CHARS: usize = 200;

/// Asks the generator for stable facts about the user in one exchange.
pub struct FactExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Facts found in `turn_text`, or `None` when there are none or the
    /// call failed.
    pub async fn extract(&self, turn_text: &str) -> Option<FactMap> {
        let prompt = format!(
            "Extract stable facts about the user from this exchange. Reply with one flat JSON \
             object mapping snake_case keys (name, nickname, occupation, interests, preferences, \
             age, location, ...) to short values. Reply with {{}} when there are none.\n\n{turn_text}"
        );
        let request = ProviderRequest::new(&self.model, vec![Message::user(prompt)]).with_temperature(0.0);

        let text = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response.into_text().ok()?,
            Ok(Err(e)) => {
                warn!(error = %e, "Fact extraction call failed");
                return None;
            }
            Err(_) => {
                warn!("Fact extraction timed out");
                return None;
            }
        };

        let facts = parse_facts(&text);
        debug!(count = facts.as_ref().map_or(0, FactMap::len), "Extracted facts");
        facts
    }
}

/// Flatten a JSON object reply into a fact map. Non-string values are
/// rendered as text; null and empty values are dropped.
pub fn parse_facts(text: &str) -> Option<FactMap> {
    let value: Value = serde_json::from_str(extract_json_block(text)).ok()?;
    let obj = value.as_object()?;

    let facts: FactMap = obj
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.trim().to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            let key = key.trim().to_lowercase().replace(' ', "_");
            if key.is_empty() || rendered.is_empty() {
                return None;
            }
            let rendered: String = rendered.chars().take(MAX_FACT_CHARS).collect();
            Some((key, rendered))
        })
        .collect();

    (!facts.is_empty()).then_some(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};

    #[test]
    fn flattens_values() {
        let facts = parse_facts(r#"{"name": "Sam", "age": 29, "interests": ["jazz", "hiking"], "pet": null}"#).unwrap();
        assert_eq!(facts.get("name").map(String::as_str), Some("Sam"));
        assert_eq!(facts.get("age").map(String::as_str), Some("29"));
        assert_eq!(facts.get("interests").map(String::as_str), Some("jazz, hiking"));
        assert!(!facts.contains_key("pet"));
    }

    #[test]
    fn empty_or_invalid_is_none() {
        assert!(parse_facts("{}").is_none());
        assert!(parse_facts("nothing to report").is_none());
        assert!(parse_facts("[1, 2]").is_none());
    }

    #[test]
    fn keys_are_normalized() {
        let facts = parse_facts(r#"{"Favorite Color": "green"}"#).unwrap();
        assert!(facts.contains_key("favorite_color"));
    }

    #[tokio::test]
    async fn extracts_from_fenced_reply() {
        let provider = Arc::new(SequentialMockProvider::texts(&["```json\n{\"occupation\": \"nurse\"}\n```"]));
        let extractor = FactExtractor::new(provider, "mock");
        let facts = extractor.extract("User: I work night shifts as a nurse").await.unwrap();
        assert_eq!(facts.get("occupation").map(String::as_str), Some("nurse"));
    }

    #[tokio::test]
    async fn provider_failure_is_none() {
        let extractor = FactExtractor::new(Arc::new(FailingProvider), "mock");
        assert!(extractor.extract("User: hi").await.is_none());
    }
}
