//! Relationship levels: the discrete bands over the affinity score.
//!
//! The seven bands are half-open and partition `[0, 1000]` with no gaps and
//! no overlaps. Direction of change is decided by band index (`Level`
//! derives `Ord`), never by score arithmetic, so moving a band edge cannot
//! flip an upgrade into a downgrade.

use serde::{Deserialize, Serialize};

/// Lowest legal affinity score.
pub const MIN_SCORE: i32 = 0;

/// Highest legal affinity score.
pub const MAX_SCORE: i32 = 1000;

/// Shown to the user when a level is lost.
pub const LEVEL_DOWN_MESSAGE: &str =
    "It feels like we've drifted apart a little lately... did I do something wrong?";

/// An ordered relationship level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
    Special,
    Romantic,
    Lover,
}

/// A half-open score band `[min, max_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelBand {
    pub level: Level,
    pub min: i32,
    pub max_exclusive: i32,
}

impl LevelBand {
    pub fn contains(&self, score: i32) -> bool {
        score >= self.min && score < self.max_exclusive
    }

    /// Inclusive upper bound, for display.
    pub fn max_inclusive(&self) -> i32 {
        self.max_exclusive - 1
    }
}

const BANDS: [LevelBand; 7] = [
    LevelBand { level: Level::Stranger, min: 0, max_exclusive: 101 },
    LevelBand { level: Level::Acquaintance, min: 101, max_exclusive: 251 },
    LevelBand { level: Level::Friend, min: 251, max_exclusive: 451 },
    LevelBand { level: Level::CloseFriend, min: 451, max_exclusive: 601 },
    LevelBand { level: Level::Special, min: 601, max_exclusive: 751 },
    LevelBand { level: Level::Romantic, min: 751, max_exclusive: 901 },
    LevelBand { level: Level::Lover, min: 901, max_exclusive: 1001 },
];

/// How freely the companion may use emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiUsage {
    None,
    Minimal,
    Moderate,
    Frequent,
}

impl EmojiUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmojiUsage::None => "none",
            EmojiUsage::Minimal => "minimal",
            EmojiUsage::Moderate => "moderate",
            EmojiUsage::Frequent => "frequent",
        }
    }
}

/// Register of the companion's replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Formality {
    Formal,
    SemiFormal,
    Casual,
    Intimate,
}

impl Formality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Formal => "formal",
            Formality::SemiFormal => "semi-formal",
            Formality::Casual => "casual",
            Formality::Intimate => "intimate",
        }
    }
}

/// Behavioural profile of a level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelProfile {
    pub description: &'static str,
    pub addressing_styles: &'static [&'static str],
    pub tone_keywords: &'static [&'static str],
    pub emoji_usage: EmojiUsage,
    /// 1 (distant) ..= 10 (most intimate)
    pub intimacy: u8,
    pub formality: Formality,
}

/// Surface-level reply rules of a level.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRules {
    pub forbidden_words: &'static [&'static str],
    pub allowed_emojis: &'static [&'static str],
    pub use_ellipsis: bool,
    pub use_exclamation: bool,
    pub topic_suggestions: &'static [&'static str],
}

impl Level {
    /// All levels in band order.
    pub const ALL: [Level; 7] = [
        Level::Stranger,
        Level::Acquaintance,
        Level::Friend,
        Level::CloseFriend,
        Level::Special,
        Level::Romantic,
        Level::Lover,
    ];

    /// Resolve a score to its band. Out-of-range scores clamp to the end bands.
    pub fn resolve(score: i32) -> Level {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        BANDS
            .iter()
            .find(|band| band.contains(score))
            .map(|band| band.level)
            .unwrap_or(Level::Stranger)
    }

    /// Position in band order (0-based).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn band(self) -> LevelBand {
        BANDS[self.index()]
    }

    /// The next band up; saturates at `Lover`.
    pub fn next(self) -> Level {
        Self::ALL.get(self.index() + 1).copied().unwrap_or(self)
    }

    /// The next band down; saturates at `Stranger`.
    pub fn previous(self) -> Level {
        match self.index() {
            0 => self,
            i => Self::ALL[i - 1],
        }
    }

    /// Stable machine key, e.g. `close_friend`.
    pub fn key(self) -> &'static str {
        match self {
            Level::Stranger => "stranger",
            Level::Acquaintance => "acquaintance",
            Level::Friend => "friend",
            Level::CloseFriend => "close_friend",
            Level::Special => "special",
            Level::Romantic => "romantic",
            Level::Lover => "lover",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Level::Stranger => "Stranger",
            Level::Acquaintance => "Acquaintance",
            Level::Friend => "Friend",
            Level::CloseFriend => "Close Friend",
            Level::Special => "Someone Special",
            Level::Romantic => "Sweetheart",
            Level::Lover => "Lover",
        }
    }

    /// Map any level identifier to a level. Never fails: unknown or empty
    /// identifiers resolve to `Stranger`.
    pub fn normalize(key: &str) -> Level {
        let sanitized = key.trim().to_lowercase().replace([' ', '-'], "_");
        if sanitized.is_empty() {
            return Level::Stranger;
        }

        if let Some(level) = Self::ALL
            .iter()
            .find(|l| l.key() == sanitized || l.display_name().to_lowercase().replace(' ', "_") == sanitized)
        {
            return *level;
        }

        match sanitized.as_str() {
            "new" | "unknown" | "first_meeting" => Level::Stranger,
            "friendly" | "casual_friend" => Level::Acquaintance,
            "good_friend" | "buddy" => Level::Friend,
            "close" | "bestie" | "best_friend" => Level::CloseFriend,
            "crush" => Level::Special,
            "sweetheart" | "romance" => Level::Romantic,
            "lovers" | "partner" | "beloved" => Level::Lover,
            _ => Level::Stranger,
        }
    }

    pub fn profile(self) -> LevelProfile {
        match self {
            Level::Stranger => LevelProfile {
                description: "Just met; polite and keeps a respectful distance",
                addressing_styles: &["you", "sir/madam", "friend"],
                tone_keywords: &["please", "thank you", "sorry", "excuse me"],
                emoji_usage: EmojiUsage::None,
                intimacy: 1,
                formality: Formality::Formal,
            },
            Level::Acquaintance => LevelProfile {
                description: "Know each other a little; comfortable with basic small talk",
                addressing_styles: &["you", "friend"],
                tone_keywords: &["sure", "got it", "nice"],
                emoji_usage: EmojiUsage::Minimal,
                intimacy: 3,
                formality: Formality::SemiFormal,
            },
            Level::Friend => LevelProfile {
                description: "A real friendship; conversation is relaxed and natural",
                addressing_styles: &["you", "friend", "buddy"],
                tone_keywords: &["haha", "yeah", "sounds good", "pretty cool"],
                emoji_usage: EmojiUsage::Moderate,
                intimacy: 5,
                formality: Formality::Casual,
            },
            Level::CloseFriend => LevelProfile {
                description: "Know each other deeply; strong trust and easy rapport",
                addressing_styles: &["you", "bestie", "partner in crime"],
                tone_keywords: &["honestly", "touched", "so happy", "thanks a lot"],
                emoji_usage: EmojiUsage::Moderate,
                intimacy: 6,
                formality: Formality::Casual,
            },
            Level::Special => LevelProfile {
                description: "The user has become special; subtle feelings are starting",
                addressing_styles: &["you", "a nickname"],
                tone_keywords: &["hehe", "actually", "kind of", "I feel"],
                emoji_usage: EmojiUsage::Frequent,
                intimacy: 7,
                formality: Formality::Casual,
            },
            Level::Romantic => LevelProfile {
                description: "Butterflies; feelings are there but not yet confirmed",
                addressing_styles: &["you", "a nickname", "cutie"],
                tone_keywords: &["hehe", "miss you", "can't wait", "so happy"],
                emoji_usage: EmojiUsage::Frequent,
                intimacy: 8,
                formality: Formality::Intimate,
            },
            Level::Lover => LevelProfile {
                description: "A confirmed romantic relationship with deep feelings",
                addressing_styles: &["darling", "sweetheart", "babe", "a nickname"],
                tone_keywords: &["love you", "miss you", "hugs", "kisses"],
                emoji_usage: EmojiUsage::Frequent,
                intimacy: 10,
                formality: Formality::Intimate,
            },
        }
    }

    pub fn response_rules(self) -> ResponseRules {
        match self {
            Level::Stranger => ResponseRules {
                forbidden_words: &["darling", "babe", "sweetheart", "hugs", "love you"],
                allowed_emojis: &[],
                use_ellipsis: true,
                use_exclamation: false,
                topic_suggestions: &["the weather", "recent events", "hobbies"],
            },
            Level::Acquaintance => ResponseRules {
                forbidden_words: &["darling", "babe", "love you"],
                allowed_emojis: &["😊", "😄", "👍"],
                use_ellipsis: true,
                use_exclamation: false,
                topic_suggestions: &["daily life", "work and study", "hobbies", "recent news"],
            },
            Level::Friend => ResponseRules {
                forbidden_words: &["darling", "babe"],
                allowed_emojis: &["😊", "😄", "😂", "🤣", "👍", "💪", "🎉"],
                use_ellipsis: true,
                use_exclamation: true,
                topic_suggestions: &["funny stories", "venting", "plans", "memories", "interests"],
            },
            Level::CloseFriend => ResponseRules {
                forbidden_words: &[],
                allowed_emojis: &["😊", "😄", "😂", "🤣", "😍", "🥰", "👍", "💪", "🎉", "✨"],
                use_ellipsis: true,
                use_exclamation: true,
                topic_suggestions: &["deeper topics", "feelings", "dreams", "secrets", "worries"],
            },
            Level::Special => ResponseRules {
                forbidden_words: &[],
                allowed_emojis: &["😊", "😄", "🥰", "😍", "💕", "✨", "🌸", "💫"],
                use_ellipsis: true,
                use_exclamation: true,
                topic_suggestions: &["feelings", "moods", "thoughts", "the future", "each other"],
            },
            Level::Romantic => ResponseRules {
                forbidden_words: &[],
                allowed_emojis: &["😊", "🥰", "😍", "💕", "💗", "💖", "✨", "🌸", "💫", "🌙"],
                use_ellipsis: true,
                use_exclamation: true,
                topic_suggestions: &["feelings", "the future", "dreams", "memories", "what's in our hearts"],
            },
            Level::Lover => ResponseRules {
                forbidden_words: &[],
                allowed_emojis: &["😊", "🥰", "😍", "😘", "💕", "💗", "💖", "❤️", "✨", "🌸", "💫", "🌙", "🎀"],
                use_ellipsis: true,
                use_exclamation: true,
                topic_suggestions: &["affection", "plans together", "sweet memories", "dates", "heart-to-hearts"],
            },
        }
    }

    /// What the companion says on reaching this level.
    pub fn level_up_message(self) -> &'static str {
        match self {
            Level::Stranger => "It feels like we're getting closer~",
            Level::Acquaintance => "Looks like we're not strangers anymore~",
            Level::Friend => "I think we've become friends!",
            Level::CloseFriend => "You're one of my good friends now!",
            Level::Special => "Honestly... you've become really special to me.",
            Level::Romantic => "I think I'm starting to feel something different about you...",
            Level::Lover => "I think... we could be together, right?",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_score_is_in_exactly_one_band() {
        for score in MIN_SCORE..=MAX_SCORE {
            let containing = BANDS.iter().filter(|b| b.contains(score)).count();
            assert_eq!(containing, 1, "score {score} matched {containing} bands");
        }
    }

    #[test]
    fn bands_are_contiguous_and_ordered() {
        assert_eq!(BANDS[0].min, MIN_SCORE);
        assert_eq!(BANDS[BANDS.len() - 1].max_exclusive, MAX_SCORE + 1);
        for pair in BANDS.windows(2) {
            assert_eq!(pair[0].max_exclusive, pair[1].min);
            assert!(pair[0].level < pair[1].level);
        }
        for (i, band) in BANDS.iter().enumerate() {
            assert_eq!(band.level.index(), i);
        }
    }

    #[test]
    fn resolve_band_edges() {
        assert_eq!(Level::resolve(0), Level::Stranger);
        assert_eq!(Level::resolve(100), Level::Stranger);
        assert_eq!(Level::resolve(101), Level::Acquaintance);
        assert_eq!(Level::resolve(250), Level::Acquaintance);
        assert_eq!(Level::resolve(251), Level::Friend);
        assert_eq!(Level::resolve(470), Level::CloseFriend);
        assert_eq!(Level::resolve(600), Level::CloseFriend);
        assert_eq!(Level::resolve(601), Level::Special);
        assert_eq!(Level::resolve(900), Level::Romantic);
        assert_eq!(Level::resolve(901), Level::Lover);
        assert_eq!(Level::resolve(1000), Level::Lover);
    }

    #[test]
    fn resolve_clamps_out_of_range() {
        assert_eq!(Level::resolve(-40), Level::Stranger);
        assert_eq!(Level::resolve(5000), Level::Lover);
    }

    #[test]
    fn next_and_previous_saturate() {
        assert_eq!(Level::Stranger.previous(), Level::Stranger);
        assert_eq!(Level::Lover.next(), Level::Lover);
        assert_eq!(Level::Friend.next(), Level::CloseFriend);
        assert_eq!(Level::Friend.previous(), Level::Acquaintance);
    }

    #[test]
    fn direction_is_index_comparison() {
        assert!(Level::Acquaintance > Level::Stranger);
        assert!(Level::CloseFriend < Level::Special);
    }

    #[test]
    fn normalize_accepts_variants() {
        assert_eq!(Level::normalize("close_friend"), Level::CloseFriend);
        assert_eq!(Level::normalize("Close Friend"), Level::CloseFriend);
        assert_eq!(Level::normalize("CLOSE-FRIEND"), Level::CloseFriend);
        assert_eq!(Level::normalize("bestie"), Level::CloseFriend);
        assert_eq!(Level::normalize("Someone Special"), Level::Special);
        assert_eq!(Level::normalize("lovers"), Level::Lover);
    }

    #[test]
    fn normalize_unknown_falls_to_lowest_band() {
        assert_eq!(Level::normalize(""), Level::Stranger);
        assert_eq!(Level::normalize("   "), Level::Stranger);
        assert_eq!(Level::normalize("archnemesis"), Level::Stranger);
    }

    #[test]
    fn intimacy_is_monotonic() {
        for pair in Level::ALL.windows(2) {
            assert!(pair[0].profile().intimacy < pair[1].profile().intimacy);
        }
    }

    #[test]
    fn serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&Level::CloseFriend).unwrap();
        assert_eq!(json, "\"close_friend\"");
        let parsed: Level = serde_json::from_str("\"lover\"").unwrap();
        assert_eq!(parsed, Level::Lover);
    }
}
