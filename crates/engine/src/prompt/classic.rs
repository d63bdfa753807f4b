//! Single-block instruction of the classic pipeline.
//!
//! Built straight from the level profile and response rules without an
//! expression stage or a section budget.

use affinity_core::analysis::EmotionAnalysis;
use affinity_core::memory::FactMap;
use affinity_core::relationship::RelationshipState;

pub struct ClassicInput<'a> {
    pub companion_name: &'a str,
    pub persona: Option<&'a str>,
    pub state: &'a RelationshipState,
    pub analysis: &'a EmotionAnalysis,
    pub episodic: Option<&'a [String]>,
    pub facts: Option<&'a FactMap>,
}

pub fn build_classic_prompt(input: &ClassicInput<'_>) -> String {
    let state = input.state;
    let level = state.level();
    let profile = level.profile();
    let rules = level.response_rules();

    let mut out = format!(
        "You are {}, a companion chatting with the user.\n",
        input.companion_name
    );
    if let Some(persona) = input.persona.filter(|p| !p.trim().is_empty()) {
        out.push_str(persona.trim());
        out.push('\n');
    }

    out.push_str(&format!(
        "\n[Relationship]\nLevel: {} ({})\nAffinity: {}/1000, trust: {}/100, tension: {}/100\nYour mood: {}\n",
        level.display_name(),
        profile.description,
        state.affinity_score,
        state.trust_score,
        state.tension_score,
        state.mood,
    ));

    let addressing: Vec<_> = profile.addressing_styles.iter().take(2).copied().collect();
    let forbidden = if rules.forbidden_words.is_empty() {
        "no restrictions".to_string()
    } else {
        rules.forbidden_words.join(", ")
    };
    out.push_str(&format!(
        "\n[Reply style]\nAddress them as: {}\nFormality: {}\nEmoji: {}\nNever say: {}\n",
        addressing.join(" / "),
        profile.formality.as_str(),
        profile.emoji_usage.as_str(),
        forbidden,
    ));

    let recalled: Vec<&str> = match input.episodic {
        Some(episodes) if !episodes.is_empty() => episodes.iter().map(String::as_str).take(5).collect(),
        _ => state.memories.iter().rev().map(String::as_str).take(5).collect(),
    };
    if !recalled.is_empty() {
        out.push_str("\n[Shared memories]\n");
        for memory in recalled {
            out.push_str(&format!("- {memory}\n"));
        }
    }

    if let Some(facts) = input.facts.filter(|f| !f.is_empty()) {
        out.push_str("\n[Known facts]\n");
        for (key, value) in facts {
            out.push_str(&format!("- {key}: {value}\n"));
        }
    }

    let a = input.analysis;
    out.push_str(&format!(
        "\n[User's emotional state]\n{} at {:.0}% intensity, intent: {}\n",
        a.primary_emotion.as_str(),
        a.intensity * 100.0,
        a.user_intent.as_str(),
    ));

    out.push_str(&format!(
        "\n[Task]\nReply naturally in character as someone at the {} level. Keep it consistent with what you remember.",
        level.display_name()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use affinity_core::relationship::RelationshipKey;

    #[test]
    fn stranger_lists_forbidden_words() {
        let state = RelationshipState::new(RelationshipKey::new("u1", "aria"));
        let analysis = EmotionAnalysis::neutral();
        let prompt = build_classic_prompt(&ClassicInput {
            companion_name: "Aria",
            persona: Some("Loves astronomy."),
            state: &state,
            analysis: &analysis,
            episodic: None,
            facts: None,
        });
        assert!(prompt.starts_with("You are Aria"));
        assert!(prompt.contains("Loves astronomy."));
        assert!(prompt.contains("Never say: darling"));
        assert!(prompt.contains("Formality: formal"));
        assert!(!prompt.contains("[Shared memories]"));
    }

    #[test]
    fn close_friend_has_no_restrictions_and_shows_memory() {
        let mut state = RelationshipState::new(RelationshipKey::new("u1", "aria"));
        state.affinity_score = 500;
        state.remember("went stargazing together");
        let analysis = EmotionAnalysis::neutral();
        let facts = FactMap::from([("name".to_string(), "Sam".to_string())]);
        let prompt = build_classic_prompt(&ClassicInput {
            companion_name: "Aria",
            persona: None,
            state: &state,
            analysis: &analysis,
            episodic: None,
            facts: Some(&facts),
        });
        assert!(prompt.contains("Never say: no restrictions"));
        assert!(prompt.contains("- went stargazing together"));
        assert!(prompt.contains("- name: Sam"));
    }
}
