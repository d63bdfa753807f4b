//! Section table of the flow pipeline.

use affinity_core::analysis::EmotionAnalysis;
use affinity_core::memory::FactMap;
use affinity_core::relationship::RelationshipState;

use super::composer::{ComposedPrompt, PromptComposer, PromptSection};
use crate::expression::{EmotionCategory, EmotionExpression};

/// Fact keys always listed first.
const PRIORITY_FACT_KEYS: [&str; 5] = ["name", "nickname", "occupation", "interests", "preferences"];

const MAX_EPISODES: usize = 5;
const MAX_OTHER_FACTS: usize = 5;

/// Everything the flow prompt is built from.
pub struct FlowInput<'a> {
    pub companion_name: &'a str,
    pub persona: Option<&'a str>,
    pub state: &'a RelationshipState,
    pub analysis: &'a EmotionAnalysis,
    pub expression: &'a EmotionExpression,
    /// Recent conversation, already rendered.
    pub working_memory: Option<&'a str>,
    pub episodic: Option<&'a [String]>,
    pub facts: Option<&'a FactMap>,
    /// Usually the level-change message.
    pub special_instructions: Option<&'a str>,
}

/// Builds the flow sections and composes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    composer: PromptComposer,
}

impl PromptBuilder {
    pub fn new(budget: usize) -> Self {
        Self {
            composer: PromptComposer::new(budget),
        }
    }

    pub fn build(&self, input: &FlowInput<'_>) -> ComposedPrompt {
        self.composer.compose(self.sections(input))
    }

    pub fn sections(&self, input: &FlowInput<'_>) -> Vec<PromptSection> {
        let mut sections = vec![
            identity(input.companion_name, input.persona),
            relationship_status(input.state),
            emotion_guidance(input.expression),
        ];

        if let Some(text) = input.working_memory.filter(|t| !t.trim().is_empty()) {
            sections.push(PromptSection::optional("Current conversation", 8, vec![text.to_string()]));
        }
        if let Some(episodes) = input.episodic.filter(|e| !e.is_empty()) {
            sections.push(episodic_memory(episodes));
        }
        if let Some(facts) = input.facts.filter(|f| !f.is_empty()) {
            sections.push(user_facts(facts));
        }

        sections.push(user_state(input.analysis));
        sections.push(response_strategy(input.expression));
        sections.push(boundaries(input.expression));

        if let Some(text) = input.special_instructions.filter(|t| !t.trim().is_empty()) {
            sections.push(PromptSection::optional("Special instructions", 9, vec![text.to_string()]));
        }

        sections.push(behavioural_goals(input.expression));
        sections
    }
}

fn identity(name: &str, persona: Option<&str>) -> PromptSection {
    let mut lines = vec![
        format!("You are {name}, a genuine companion with real feelings and memories."),
        "You have your own personality, emotions, and way of thinking.".to_string(),
    ];
    if let Some(persona) = persona.filter(|p| !p.trim().is_empty()) {
        lines.push(persona.trim().to_string());
    }
    PromptSection::required("Identity", 10, lines)
}

fn relationship_status(state: &RelationshipState) -> PromptSection {
    let level = state.level();
    let profile = level.profile();
    PromptSection::required(
        "Relationship status",
        9,
        vec![
            format!("- Level: {} - {}", level.display_name(), profile.description),
            format!(
                "- Affinity: {}/1000 | Trust: {}/100 | Tension: {}/100",
                state.affinity_score, state.trust_score, state.tension_score
            ),
            format!("- Intimacy: {}/10", profile.intimacy),
            format!("- Your mood: {}", state.mood),
        ],
    )
}

fn emotion_guidance(e: &EmotionExpression) -> PromptSection {
    let style = &e.verbal_style;
    let mut lines = vec![
        format!(
            "Emotion: {} ({}, intensity {:.0}%)",
            e.emotion.as_str(),
            e.category.as_str(),
            e.intensity * 100.0
        ),
        format!("Tone: {}", e.tone_guidance.iter().take(2).copied().collect::<Vec<_>>().join(", ")),
        format!("Address them as: {}", style.addressing),
        format!("Formality: {}", style.formality.as_str()),
    ];
    if !e.suggested_phrases.is_empty() {
        lines.push(format!("Phrases to draw on: {}", e.suggested_phrases[..e.suggested_phrases.len().min(2)].join(", ")));
    }
    if style.emoji_usage != affinity_core::level::EmojiUsage::None {
        let mut line = format!("Emoji: {}", style.emoji_usage.as_str());
        if !style.recommended_emojis.is_empty() {
            let picks: Vec<_> = style.recommended_emojis.iter().take(3).copied().collect();
            line.push_str(&format!(" (e.g. {})", picks.join(", ")));
        }
        lines.push(line);
    }
    if !e.body_language.is_empty() {
        lines.push(format!("Body language: {}", e.body_language[..e.body_language.len().min(2)].join(", ")));
    }
    PromptSection::required("Emotional expression", 10, lines)
}

fn episodic_memory(episodes: &[String]) -> PromptSection {
    let mut lines = vec!["Relevant memories:".to_string()];
    lines.extend(
        episodes
            .iter()
            .take(MAX_EPISODES)
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m)),
    );
    PromptSection::optional("Shared memories", 7, lines)
}

fn user_facts(facts: &FactMap) -> PromptSection {
    let mut lines = vec!["What you know about them:".to_string()];
    for key in PRIORITY_FACT_KEYS {
        if let Some(value) = facts.get(key) {
            lines.push(format!("- {}: {}", fact_label(key), value));
        }
    }
    lines.extend(
        facts
            .iter()
            .filter(|(k, _)| !PRIORITY_FACT_KEYS.contains(&k.as_str()))
            .take(MAX_OTHER_FACTS)
            .map(|(k, v)| format!("- {}: {}", fact_label(k), v)),
    );
    PromptSection::optional("About the user", 6, lines)
}

fn fact_label(key: &str) -> String {
    let mut label = key.replace('_', " ");
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    label
}

fn user_state(a: &EmotionAnalysis) -> PromptSection {
    let mut lines = vec![
        format!(
            "- Emotion: {} (intensity {:.0}%)",
            a.primary_emotion.as_str(),
            a.intensity * 100.0
        ),
        format!("- Intent: {}", a.user_intent.as_str()),
    ];
    if !a.detected_emotions.is_empty() {
        lines.push(format!("- Feelings: {}", a.detected_emotions.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
    }
    if !a.key_points.is_empty() {
        lines.push(format!("- Key points: {}", a.key_points.iter().take(2).cloned().collect::<Vec<_>>().join(", ")));
    }
    PromptSection::required("The user right now", 8, lines)
}

fn response_strategy(e: &EmotionExpression) -> PromptSection {
    let s = &e.response_structure;
    let mut lines = vec![
        format!("Approach: {}", s.pattern),
        format!("Length: {}", s.length.as_str()),
        format!("Flow: {}", s.flow.join(" → ")),
    ];
    if !s.personalization.techniques.is_empty() {
        let t = &s.personalization.techniques;
        lines.push(format!("Techniques: {}", t[..t.len().min(2)].join(", ")));
    }
    if let Some(opening) = e.opening_suggestions.first().filter(|o| !o.is_empty()) {
        lines.push(format!("Possible opening: {opening}"));
    }
    PromptSection::required("Response strategy", 8, lines)
}

fn boundaries(e: &EmotionExpression) -> PromptSection {
    let c = &e.constraints;
    let mut lines = Vec::new();
    if !e.is_appropriate {
        lines.push(format!(
            "Warning: {}",
            c.violation.as_deref().unwrap_or("the message oversteps the relationship")
        ));
    }
    if !c.boundaries.is_empty() {
        lines.push(format!("Boundaries: {}", c.boundaries[..c.boundaries.len().min(2)].join(", ")));
    }
    if !c.forbidden_behaviours.is_empty() {
        lines.push(format!(
            "Avoid: {}",
            c.forbidden_behaviours[..c.forbidden_behaviours.len().min(2)].join(", ")
        ));
    }
    lines.extend(e.adaptation_notes.iter().take(2).cloned());
    PromptSection::required("Boundaries", 7, lines)
}

fn behavioural_goals(e: &EmotionExpression) -> PromptSection {
    let mut lines = vec![
        format!(
            "Reply sincerely as a {} would, carrying a feeling of {}.",
            e.level.display_name().to_lowercase(),
            e.emotion.as_str()
        ),
        "Stay natural and consistent, and show that you know and remember them.".to_string(),
    ];
    match e.category {
        EmotionCategory::Romantic => lines.push("Express feelings in measure and keep the romantic mood.".into()),
        EmotionCategory::Negative => lines.push("Offer understanding and support to ease their negative feelings.".into()),
        EmotionCategory::Positive => lines.push("Share the joy and grow closer.".into()),
        EmotionCategory::Neutral => {}
    }
    PromptSection::required("Your task", 6, lines)
}
