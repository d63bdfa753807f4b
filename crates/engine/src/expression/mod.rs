//! Emotion expression synthesis.
//!
//! Turns an [`EmotionAnalysis`] plus the relationship context into a style
//! descriptor for the reply: which emotion to voice, how strongly, in what
//! register, and within which intimacy boundaries. Pure and deterministic.

mod templates;

pub use templates::{EmotionTemplate, template};

use affinity_core::analysis::{EmotionAnalysis, Sentiment, UserIntent};
use affinity_core::level::{EmojiUsage, Formality, Level};
use serde::Serialize;

/// Broad family of an emotion, mirroring [`Sentiment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    Positive,
    Romantic,
    Negative,
    Neutral,
}

impl From<Sentiment> for EmotionCategory {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Positive => EmotionCategory::Positive,
            Sentiment::Romantic => EmotionCategory::Romantic,
            Sentiment::Negative => EmotionCategory::Negative,
            Sentiment::Neutral => EmotionCategory::Neutral,
        }
    }
}

impl EmotionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionCategory::Positive => "positive",
            EmotionCategory::Romantic => "romantic",
            EmotionCategory::Negative => "negative",
            EmotionCategory::Neutral => "neutral",
        }
    }
}

/// A specific emotion with its own expression templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionKind {
    Joy,
    Gratitude,
    Excitement,
    Affection,
    Love,
    Longing,
    Sadness,
    Disappointment,
    Curiosity,
    Calm,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 10] = [
        EmotionKind::Joy,
        EmotionKind::Gratitude,
        EmotionKind::Excitement,
        EmotionKind::Affection,
        EmotionKind::Love,
        EmotionKind::Longing,
        EmotionKind::Sadness,
        EmotionKind::Disappointment,
        EmotionKind::Curiosity,
        EmotionKind::Calm,
    ];

    /// Unknown labels are calm.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "joy" | "happiness" => EmotionKind::Joy,
            "gratitude" => EmotionKind::Gratitude,
            "excitement" => EmotionKind::Excitement,
            "affection" => EmotionKind::Affection,
            "love" => EmotionKind::Love,
            "longing" | "missing" => EmotionKind::Longing,
            "sadness" => EmotionKind::Sadness,
            "disappointment" => EmotionKind::Disappointment,
            "curiosity" => EmotionKind::Curiosity,
            _ => EmotionKind::Calm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionKind::Joy => "joy",
            EmotionKind::Gratitude => "gratitude",
            EmotionKind::Excitement => "excitement",
            EmotionKind::Affection => "affection",
            EmotionKind::Love => "love",
            EmotionKind::Longing => "longing",
            EmotionKind::Sadness => "sadness",
            EmotionKind::Disappointment => "disappointment",
            EmotionKind::Curiosity => "curiosity",
            EmotionKind::Calm => "calm",
        }
    }

    pub fn category(&self) -> EmotionCategory {
        match self {
            EmotionKind::Joy | EmotionKind::Gratitude | EmotionKind::Excitement => EmotionCategory::Positive,
            EmotionKind::Affection | EmotionKind::Love | EmotionKind::Longing => EmotionCategory::Romantic,
            EmotionKind::Sadness | EmotionKind::Disappointment => EmotionCategory::Negative,
            EmotionKind::Curiosity | EmotionKind::Calm => EmotionCategory::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
}

impl IntensityLevel {
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity < 0.3 {
            IntensityLevel::Low
        } else if intensity < 0.7 {
            IntensityLevel::Medium
        } else {
            IntensityLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityLevel::Low => "low",
            IntensityLevel::Medium => "medium",
            IntensityLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerbalStyle {
    pub formality: Formality,
    pub tone: &'static str,
    pub addressing: &'static str,
    pub emoji_usage: EmojiUsage,
    pub recommended_emojis: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    ShortToMedium,
    Medium,
    MediumToLong,
    Long,
}

impl ResponseLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseLength::ShortToMedium => "short to medium",
            ResponseLength::Medium => "medium",
            ResponseLength::MediumToLong => "medium to long",
            ResponseLength::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Personalization {
    pub level: IntensityLevel,
    pub techniques: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseStructure {
    pub pattern: &'static str,
    pub length: ResponseLength,
    pub flow: &'static [&'static str],
    pub personalization: Personalization,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntimacyConstraints {
    pub intimacy: u8,
    pub boundaries: Vec<&'static str>,
    pub allowed_topics: Vec<&'static str>,
    pub forbidden_behaviours: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
}

/// Full style descriptor for one reply.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionExpression {
    pub emotion: EmotionKind,
    pub category: EmotionCategory,
    pub intensity: f64,
    pub intensity_level: IntensityLevel,

    pub verbal_style: VerbalStyle,
    pub tone_guidance: &'static [&'static str],
    pub suggested_phrases: &'static [&'static str],
    pub punctuation_guide: &'static [&'static str],

    pub body_language: &'static [&'static str],
    pub facial_expression: &'static [&'static str],
    pub voice_characteristics: &'static [&'static str],

    pub response_structure: ResponseStructure,
    pub opening_suggestions: &'static [&'static str],
    pub closing_suggestions: &'static [&'static str],

    pub level: Level,
    pub constraints: IntimacyConstraints,

    pub user_intent: UserIntent,
    pub is_appropriate: bool,
    pub adaptation_notes: Vec<String>,
}

/// Build the expression for one turn.
pub fn synthesize(analysis: &EmotionAnalysis, level: Level, trust: i32, tension: i32, mood: &str) -> EmotionExpression {
    let category = EmotionCategory::from(analysis.primary_emotion);
    let emotion = match analysis.detected_emotions.first() {
        Some(label) => EmotionKind::parse(label),
        None if category == EmotionCategory::Neutral => EmotionKind::Calm,
        None => EmotionKind::Joy,
    };
    let intensity_level = IntensityLevel::from_intensity(analysis.intensity);
    let tmpl = template(emotion, category, intensity_level);
    let profile = level.profile();

    let verbal_style = VerbalStyle {
        formality: profile.formality,
        tone: tmpl.tone_modifiers.first().copied().unwrap_or("natural"),
        addressing: profile.addressing_styles.first().copied().unwrap_or("you"),
        emoji_usage: profile.emoji_usage,
        recommended_emojis: if profile.emoji_usage == EmojiUsage::None {
            Vec::new()
        } else {
            emojis_in(tmpl.punctuation_patterns)
        },
    };

    let response_structure = ResponseStructure {
        pattern: tmpl.response_patterns.first().copied().unwrap_or("natural reply"),
        length: response_length(analysis.user_intent, profile.intimacy),
        flow: response_flow(analysis.user_intent),
        personalization: personalization(profile.intimacy),
    };

    EmotionExpression {
        emotion: tmpl.kind,
        category,
        intensity: analysis.intensity,
        intensity_level,
        verbal_style,
        tone_guidance: tmpl.tone_modifiers,
        suggested_phrases: &tmpl.verbal_expressions[..tmpl.verbal_expressions.len().min(3)],
        punctuation_guide: tmpl.punctuation_patterns,
        body_language: tmpl.body_language,
        facial_expression: tmpl.facial_expressions,
        voice_characteristics: tmpl.voice_characteristics,
        response_structure,
        opening_suggestions: tmpl.opening_phrases,
        closing_suggestions: tmpl.closing_phrases,
        level,
        constraints: intimacy_constraints(profile.intimacy, analysis),
        user_intent: analysis.user_intent,
        is_appropriate: analysis.is_appropriate,
        adaptation_notes: adaptation_notes(analysis, trust, tension, mood),
    }
}

/// Patterns made only of non-ASCII glyphs.
fn emojis_in(patterns: &'static [&'static str]) -> Vec<&'static str> {
    patterns
        .iter()
        .copied()
        .filter(|p| !p.is_empty() && p.chars().all(|c| !c.is_ascii()))
        .collect()
}

fn response_length(intent: UserIntent, intimacy: u8) -> ResponseLength {
    match intent {
        UserIntent::Question | UserIntent::Request => ResponseLength::MediumToLong,
        UserIntent::Greeting | UserIntent::Compliment => ResponseLength::ShortToMedium,
        UserIntent::Sharing | UserIntent::Confession if intimacy >= 7 => ResponseLength::Long,
        _ => ResponseLength::Medium,
    }
}

fn response_flow(intent: UserIntent) -> &'static [&'static str] {
    match intent {
        UserIntent::Greeting => &["return the greeting", "a little small talk"],
        UserIntent::Question => &["understand the question", "answer it", "extend naturally"],
        UserIntent::Sharing => &["show understanding", "respond to the feeling", "share a related view"],
        UserIntent::Compliment => &["say thanks", "respond modestly", "move on or go deeper"],
        UserIntent::Complaint => &["show understanding", "offer comfort", "suggest something"],
        UserIntent::Request => &["confirm the need", "help", "follow up"],
        UserIntent::Confession => &["receive the feeling", "respond sincerely", "state your position"],
        UserIntent::Unknown => &["understand the intent", "respond naturally"],
    }
}

fn personalization(intimacy: u8) -> Personalization {
    if intimacy <= 3 {
        Personalization {
            level: IntensityLevel::Low,
            techniques: &["basic politeness", "keep an appropriate distance"],
        }
    } else if intimacy <= 6 {
        Personalization {
            level: IntensityLevel::Medium,
            techniques: &["warmer form of address", "share some feelings", "light humor"],
        }
    } else {
        Personalization {
            level: IntensityLevel::High,
            techniques: &["use a nickname", "deep emotional expression", "recall shared memories", "show care"],
        }
    }
}

const BOUNDARY_TIERS: [&[&str]; 4] = [
    &[
        "keep a polite distance",
        "avoid overly private topics",
        "no pet names",
        "no romantic feelings",
    ],
    &[
        "friendliness is fine",
        "avoid excessive intimacy",
        "no romantic feelings",
        "stay within friendship",
    ],
    &[
        "special feelings may show",
        "avoid extreme expressions",
        "handle romantic hints carefully",
    ],
    &[
        "romantic feelings may be expressed",
        "stay sincere and respectful",
        "avoid over-dependence",
    ],
];

const KEEP_DISTANCE: &str = "keep some distance: the message goes beyond the current relationship";

fn boundary_tier(intimacy: u8) -> usize {
    match intimacy {
        0..=2 => 0,
        3..=5 => 1,
        6..=7 => 2,
        _ => 3,
    }
}

fn intimacy_constraints(intimacy: u8, analysis: &EmotionAnalysis) -> IntimacyConstraints {
    let tier = boundary_tier(intimacy);
    let (boundaries, violation) = if analysis.is_appropriate {
        (BOUNDARY_TIERS[tier].to_vec(), None)
    } else {
        let mut narrowed = vec![KEEP_DISTANCE];
        narrowed.extend_from_slice(BOUNDARY_TIERS[tier.saturating_sub(1)]);
        let reason = analysis
            .violation_reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "too intimate for the current relationship".into());
        (narrowed, Some(reason))
    };

    let mut allowed_topics = vec!["daily life", "hobbies", "work and study"];
    if intimacy >= 4 {
        allowed_topics.extend(["personal feelings", "life troubles", "future plans"]);
    }
    if intimacy >= 7 {
        allowed_topics.extend(["deep feelings", "the relationship itself", "romance"]);
    }

    let mut forbidden_behaviours = Vec::new();
    if intimacy < 7 {
        forbidden_behaviours.extend(["declaring strong love", "overly intimate forms of address", "hinting at physical contact"]);
    }
    if intimacy < 5 {
        forbidden_behaviours.extend(["sharing very private information", "showing special affection"]);
    }
    if intimacy < 3 {
        forbidden_behaviours.extend(["prying into their private life", "informal language"]);
    }

    IntimacyConstraints {
        intimacy,
        boundaries,
        allowed_topics,
        forbidden_behaviours,
        violation,
    }
}

fn adaptation_notes(analysis: &EmotionAnalysis, trust: i32, tension: i32, mood: &str) -> Vec<String> {
    let mut notes = Vec::new();

    if !analysis.is_appropriate {
        let reason = analysis.violation_reason.as_deref().unwrap_or("too intimate");
        notes.push(format!("The message may overstep the current relationship: {reason}"));
    }

    if trust < 30 {
        notes.push("Trust is low: be careful and sincere".into());
    } else if trust > 80 {
        notes.push("Trust is high: you can be open and go deeper".into());
    }

    if tension > 60 {
        notes.push("Tension is high: ease the mood and avoid conflict".into());
    } else if tension < 20 {
        notes.push("The mood is relaxed: feel free to be playful".into());
    }

    match mood {
        "happy" | "excited" => notes.push("Keep the positive energy going".into()),
        "sad" | "depressed" => notes.push("Offer emotional support in a gentle voice".into()),
        _ => {}
    }

    match analysis.user_intent {
        UserIntent::Confession => notes.push("They may be expressing special feelings: take it seriously".into()),
        UserIntent::Complaint => notes.push("They are venting: offer understanding and support".into()),
        _ => {}
    }

    notes
}
