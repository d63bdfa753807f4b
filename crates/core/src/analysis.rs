//! Per-turn emotion and intent analysis.
//!
//! Closed enums replace the free-form labels a generator might return; each
//! has an explicit fallback arm so unexpected labels degrade instead of
//! failing the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bounds on the suggested affinity delta.
pub const AFFINITY_SUGGESTION_RANGE: (i32, i32) = (-50, 50);

/// Bounds on the suggested trust and tension deltas.
pub const SUBSCORE_SUGGESTION_RANGE: (i32, i32) = (-10, 10);

/// Overall polarity of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Romantic,
    #[serde(other)]
    Neutral,
}

impl Sentiment {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "romantic" => Sentiment::Romantic,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Romantic => "romantic",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// What the user is trying to do with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIntent {
    Greeting,
    Sharing,
    Question,
    Compliment,
    Complaint,
    Request,
    Confession,
    #[serde(other)]
    Unknown,
}

impl UserIntent {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "greeting" => UserIntent::Greeting,
            "sharing" => UserIntent::Sharing,
            "question" => UserIntent::Question,
            "compliment" => UserIntent::Compliment,
            "complaint" => UserIntent::Complaint,
            "request" => UserIntent::Request,
            "confession" => UserIntent::Confession,
            _ => UserIntent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserIntent::Greeting => "greeting",
            UserIntent::Sharing => "sharing",
            UserIntent::Question => "question",
            UserIntent::Compliment => "compliment",
            UserIntent::Complaint => "complaint",
            UserIntent::Request => "request",
            UserIntent::Confession => "confession",
            UserIntent::Unknown => "unknown",
        }
    }
}

/// Structured reading of one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub primary_emotion: Sentiment,
    /// 0.0..=1.0
    pub intensity: f64,
    pub detected_emotions: Vec<String>,
    pub user_intent: UserIntent,
    /// Whether the message fits the current relationship level.
    pub is_appropriate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_reason: Option<String>,
    pub suggested_affinity_change: i32,
    pub suggested_trust_change: i32,
    pub suggested_tension_change: i32,
    pub key_points: Vec<String>,
    pub is_memorable: bool,
}

impl EmotionAnalysis {
    /// The fixed result used whenever analysis cannot be obtained.
    pub fn neutral() -> Self {
        Self {
            primary_emotion: Sentiment::Neutral,
            intensity: 0.3,
            detected_emotions: Vec::new(),
            user_intent: UserIntent::Unknown,
            is_appropriate: true,
            violation_reason: None,
            suggested_affinity_change: 1,
            suggested_trust_change: 0,
            suggested_tension_change: 0,
            key_points: Vec::new(),
            is_memorable: false,
        }
    }

    /// Build an analysis from a loosely-typed JSON object.
    ///
    /// Missing fields take defaults, numbers may arrive as strings or floats,
    /// and every numeric field is clamped into its legal range. Returns `None`
    /// only when `value` is not a JSON object.
    pub fn from_json_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let primary_emotion = obj
            .get("primary_emotion")
            .and_then(Value::as_str)
            .map(Sentiment::parse)
            .unwrap_or(Sentiment::Neutral);

        let intensity = obj
            .get("emotion_intensity")
            .or_else(|| obj.get("intensity"))
            .and_then(loose_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        let user_intent = obj
            .get("user_intent")
            .and_then(Value::as_str)
            .map(UserIntent::parse)
            .unwrap_or(UserIntent::Unknown);

        let violation_reason = obj
            .get("violation_reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let (a_lo, a_hi) = AFFINITY_SUGGESTION_RANGE;
        let (s_lo, s_hi) = SUBSCORE_SUGGESTION_RANGE;

        Some(Self {
            primary_emotion,
            intensity,
            detected_emotions: string_list(obj.get("detected_emotions")),
            user_intent,
            is_appropriate: obj.get("is_appropriate").and_then(loose_bool).unwrap_or(true),
            violation_reason,
            suggested_affinity_change: loose_i32(obj.get("suggested_affinity_change")).clamp(a_lo, a_hi),
            suggested_trust_change: loose_i32(obj.get("suggested_trust_change")).clamp(s_lo, s_hi),
            suggested_tension_change: loose_i32(obj.get("suggested_tension_change")).clamp(s_lo, s_hi),
            key_points: string_list(obj.get("key_points")),
            is_memorable: obj.get("is_memorable").and_then(loose_bool).unwrap_or(false),
        })
    }
}

fn loose_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_i32(value: Option<&Value>) -> i32 {
    value
        .and_then(loose_f64)
        .filter(|f| f.is_finite())
        .map(|f| f.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
        .unwrap_or(0)
}

fn loose_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn neutral_default_is_near_zero() {
        let a = EmotionAnalysis::neutral();
        assert_eq!(a.primary_emotion, Sentiment::Neutral);
        assert!((a.intensity - 0.3).abs() < f64::EPSILON);
        assert!(a.suggested_affinity_change.abs() <= 1);
        assert_eq!(a.suggested_trust_change, 0);
        assert!(a.is_appropriate);
        assert!(!a.is_memorable);
    }

    #[test]
    fn parses_complete_object() {
        let value = json!({
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
        });
        let a = EmotionAnalysis::from_json_value(&value).unwrap();
        assert_eq!(a.primary_emotion, Sentiment::Positive);
        assert_eq!(a.detected_emotions, vec!["joy", "gratitude"]);
        assert_eq!(a.user_intent, UserIntent::Sharing);
        assert_eq!(a.suggested_affinity_change, 8);
        assert!(a.violation_reason.is_none());
        assert!(a.is_memorable);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let value = json!({
            "emotion_intensity": 3.5,
            "suggested_affinity_change": 400,
            "suggested_trust_change": -99,
            "suggested_tension_change": "15"
        });
        let a = EmotionAnalysis::from_json_value(&value).unwrap();
        assert!((a.intensity - 1.0).abs() < f64::EPSILON);
        assert_eq!(a.suggested_affinity_change, 50);
        assert_eq!(a.suggested_trust_change, -10);
        assert_eq!(a.suggested_tension_change, 10);
    }

    #[test]
    fn unknown_labels_fall_back() {
        let value = json!({ "primary_emotion": "ecstatic", "user_intent": "ranting" });
        let a = EmotionAnalysis::from_json_value(&value).unwrap();
        assert_eq!(a.primary_emotion, Sentiment::Neutral);
        assert_eq!(a.user_intent, UserIntent::Unknown);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(EmotionAnalysis::from_json_value(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn serde_other_arm_for_enums() {
        let s: Sentiment = serde_json::from_str("\"melancholy\"").unwrap();
        assert_eq!(s, Sentiment::Neutral);
        let i: UserIntent = serde_json::from_str("\"bargaining\"").unwrap();
        assert_eq!(i, UserIntent::Unknown);
    }
}
