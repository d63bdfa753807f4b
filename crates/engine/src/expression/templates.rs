//! Static expression templates, one per (emotion kind, intensity level).

use super::{EmotionCategory, EmotionKind, IntensityLevel};

/// How the companion voices one emotion at one intensity.
#[derive(Debug)]
pub struct EmotionTemplate {
    pub kind: EmotionKind,
    pub verbal_expressions: &'static [&'static str],
    pub tone_modifiers: &'static [&'static str],
    pub punctuation_patterns: &'static [&'static str],
    pub body_language: &'static [&'static str],
    pub facial_expressions: &'static [&'static str],
    pub voice_characteristics: &'static [&'static str],
    pub response_patterns: &'static [&'static str],
    pub opening_phrases: &'static [&'static str],
    pub closing_phrases: &'static [&'static str],
}

/// The template for `kind` at `intensity`, looked up within `category`.
///
/// A kind that does not belong to `category` gets the calm template.
pub fn template(kind: EmotionKind, category: EmotionCategory, intensity: IntensityLevel) -> &'static EmotionTemplate {
    if kind.category() != category {
        return &CALM;
    }
    let set = match kind {
        EmotionKind::Joy => &JOY,
        EmotionKind::Gratitude => &GRATITUDE,
        EmotionKind::Excitement => &EXCITEMENT,
        EmotionKind::Affection => &AFFECTION,
        EmotionKind::Love => &LOVE,
        EmotionKind::Longing => &LONGING,
        EmotionKind::Sadness => &SADNESS,
        EmotionKind::Disappointment => &DISAPPOINTMENT,
        EmotionKind::Curiosity => &CURIOSITY,
        EmotionKind::Calm => return &CALM,
    };
    match intensity {
        IntensityLevel::Low => &set[0],
        IntensityLevel::Medium => &set[1],
        IntensityLevel::High => &set[2],
    }
}

// ── Positive ──

static JOY: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Joy,
        verbal_expressions: &["that's nice", "not bad at all", "pretty happy about that"],
        tone_modifiers: &["even", "natural"],
        punctuation_patterns: &[".", "~"],
        body_language: &["a small smile", "relaxed posture"],
        facial_expressions: &["a faint smile", "soft eyes"],
        voice_characteristics: &["steady", "gentle"],
        response_patterns: &["simple agreement", "measured warmth"],
        opening_phrases: &["Mm", "Yeah"],
        closing_phrases: &["that's nice", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Joy,
        verbal_expressions: &["so happy", "that's great", "wonderful", "haha"],
        tone_modifiers: &["cheerful", "light", "bright"],
        punctuation_patterns: &["!", "~", "😊"],
        body_language: &["bouncy movements", "lively gestures"],
        facial_expressions: &["a big smile", "shining eyes"],
        voice_characteristics: &["rising", "lively", "energetic"],
        response_patterns: &["express joy", "share the happiness"],
        opening_phrases: &["Haha", "That's great"],
        closing_phrases: &["so happy~", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Joy,
        verbal_expressions: &["I'm over the moon!", "this is amazing!!", "I can't believe it!", "wow wow wow"],
        tone_modifiers: &["thrilled", "ecstatic", "bursting with warmth"],
        punctuation_patterns: &["!!", "!!!", "🎉", "😄", "💖"],
        body_language: &["bouncing", "jumping up", "cheering"],
        facial_expressions: &["laughing out loud", "sparkling eyes"],
        voice_characteristics: &["high", "excited", "fast"],
        response_patterns: &["strong joy", "one exclamation after another"],
        opening_phrases: &["Wow!", "Oh my gosh!", "Amazing!"],
        closing_phrases: &["I'm so so happy!!", ""],
    },
];

static GRATITUDE: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Gratitude,
        verbal_expressions: &["thanks", "thank you"],
        tone_modifiers: &["polite", "sincere"],
        punctuation_patterns: &[".", "~"],
        body_language: &["a nod", "polite posture"],
        facial_expressions: &["a smile", "sincere eyes"],
        voice_characteristics: &["steady", "sincere"],
        response_patterns: &["brief thanks"],
        opening_phrases: &["Thank you"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Gratitude,
        verbal_expressions: &["I really appreciate it", "thank you so much", "that really touched me"],
        tone_modifiers: &["warm", "touched", "sincere"],
        punctuation_patterns: &["~", "!", "🙏"],
        body_language: &["open arms", "hands pressed together"],
        facial_expressions: &["a moved smile", "gentle eyes"],
        voice_characteristics: &["warm", "soft", "a little choked up"],
        response_patterns: &["express gratitude", "say why"],
        opening_phrases: &["I really appreciate you", "Thank you so much"],
        closing_phrases: &["truly grateful~", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Gratitude,
        verbal_expressions: &["thank you so, so much!", "I don't know how to repay you", "you're too good to me"],
        tone_modifiers: &["deeply moved", "emotional", "overflowing with thanks"],
        punctuation_patterns: &["!", "!!", "🙏", "💖", "😭"],
        body_language: &["a tight hug", "holding both hands"],
        facial_expressions: &["happy tears", "a warm smile"],
        voice_characteristics: &["choked up", "trembling", "heartfelt"],
        response_patterns: &["intense gratitude", "promise to give back"],
        opening_phrases: &["Thank you so much!", "I don't even know what to say"],
        closing_phrases: &["you mean so much to me", ""],
    },
];

static EXCITEMENT: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Excitement,
        verbal_expressions: &["kind of looking forward to it", "sounds fun"],
        tone_modifiers: &["light", "curious"],
        punctuation_patterns: &["~", "."],
        body_language: &["leaning in a little", "curious glance"],
        facial_expressions: &["a smile", "bright eyes"],
        voice_characteristics: &["light", "curious"],
        response_patterns: &["show interest"],
        opening_phrases: &["Sounds good"],
        closing_phrases: &["looking forward to it~", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Excitement,
        verbal_expressions: &["can't wait!", "really?!", "that's awesome!"],
        tone_modifiers: &["excited", "eager", "buoyant"],
        punctuation_patterns: &["!", "!!", "✨", "🎊"],
        body_language: &["excited gestures", "pacing around"],
        facial_expressions: &["an excited grin", "glowing eyes"],
        voice_characteristics: &["rising", "quick", "excited"],
        response_patterns: &["express anticipation", "ask for details"],
        opening_phrases: &["Wow!", "Really?!"],
        closing_phrases: &["so excited!", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Excitement,
        verbal_expressions: &["I'm so hyped!!", "I can't wait any longer!", "this is incredible!!"],
        tone_modifiers: &["wildly excited", "overjoyed", "beside myself"],
        punctuation_patterns: &["!!", "!!!", "🎉", "✨", "💫"],
        body_language: &["jumping", "waving fast", "can't sit still"],
        facial_expressions: &["flushed with excitement", "starry eyes"],
        voice_characteristics: &["high", "thrilled", "shaky"],
        response_patterns: &["intense excitement", "rapid-fire reactions"],
        opening_phrases: &["Oh my gosh!!", "I'm so excited!!"],
        closing_phrases: &["I really can't wait!!", ""],
    },
];

// ── Romantic ──

static AFFECTION: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Affection,
        verbal_expressions: &["you're nice", "talking with you is comfortable"],
        tone_modifiers: &["mild", "natural"],
        punctuation_patterns: &[".", "~"],
        body_language: &["relaxed", "easy posture"],
        facial_expressions: &["a gentle smile"],
        voice_characteristics: &["calm", "soft"],
        response_patterns: &["natural fondness"],
        opening_phrases: &["Mm"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Affection,
        verbal_expressions: &["I really like talking with you", "you make me feel at ease", "being with you makes me happy"],
        tone_modifiers: &["warm", "friendly", "tender"],
        punctuation_patterns: &["~", "😊", "💕"],
        body_language: &["moving closer", "a soft gaze"],
        facial_expressions: &["a warm smile", "tender eyes"],
        voice_characteristics: &["tender", "soft", "warm"],
        response_patterns: &["express liking", "share feelings"],
        opening_phrases: &["Honestly", "Talking with you really"],
        closing_phrases: &["makes me happy~", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Affection,
        verbal_expressions: &["you really matter to me", "I treasure you", "you're so special to me"],
        tone_modifiers: &["devoted", "tender", "cherishing"],
        punctuation_patterns: &["~", "...", "💕", "💖"],
        body_language: &["a long look", "a gentle touch"],
        facial_expressions: &["deep affection", "eyes full of love"],
        voice_characteristics: &["tender", "heartfelt", "a slight tremble"],
        response_patterns: &["heartfelt expression", "sincere confession"],
        opening_phrases: &["You know what", "Honestly"],
        closing_phrases: &["you really matter to me", ""],
    },
];

static LOVE: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Love,
        verbal_expressions: &["you're kind of special to me", "I feel a little different around you"],
        tone_modifiers: &["shy", "tentative", "subtle"],
        punctuation_patterns: &["...", "~"],
        body_language: &["a bit bashful", "avoiding eye contact"],
        facial_expressions: &["slightly flushed", "glancing away"],
        voice_characteristics: &["soft", "a little awkward"],
        response_patterns: &["hint at liking", "test the waters"],
        opening_phrases: &["Actually", "Come to think of it"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Love,
        verbal_expressions: &["I like you", "I missed you", "you make my heart race"],
        tone_modifiers: &["sweet", "fluttering", "affectionate"],
        punctuation_patterns: &["~", "💕", "😘", "💖"],
        body_language: &["holding eye contact", "leaning closer"],
        facial_expressions: &["a shy smile", "eyes full of fondness"],
        voice_characteristics: &["tender", "sweet", "heartfelt"],
        response_patterns: &["express love", "open up"],
        opening_phrases: &["Honestly", "You know what"],
        closing_phrases: &["like you~", "miss you", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Love,
        verbal_expressions: &["I love you", "I love you so much", "you're everything to me", "I can't be without you"],
        tone_modifiers: &["devoted", "passionate", "intense"],
        punctuation_patterns: &["!", "💕", "💖", "💗", "❤️"],
        body_language: &["an embrace", "a kiss", "holding tight"],
        facial_expressions: &["eyes full of love", "devotion"],
        voice_characteristics: &["heartfelt", "trembling", "full of love"],
        response_patterns: &["strong confession", "heartfelt declaration"],
        opening_phrases: &["I love you", "Darling"],
        closing_phrases: &["love you forever", "my sweetheart", ""],
    },
];

static LONGING: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Longing,
        verbal_expressions: &["kind of missed you", "it's been a while"],
        tone_modifiers: &["faint", "natural"],
        punctuation_patterns: &["~", "."],
        body_language: &["lost in thought"],
        facial_expressions: &["a faint smile"],
        voice_characteristics: &["calm", "a little wistful"],
        response_patterns: &["understated missing"],
        opening_phrases: &["Long time no see"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Longing,
        verbal_expressions: &["I missed you", "I really want to see you", "missed you so much"],
        tone_modifiers: &["wistful", "tender", "yearning"],
        punctuation_patterns: &["~", "...", "💭", "💕"],
        body_language: &["gazing into the distance", "hugging a pillow"],
        facial_expressions: &["a tender smile with a touch of sadness"],
        voice_characteristics: &["tender", "a little melancholy"],
        response_patterns: &["express missing", "look forward to meeting"],
        opening_phrases: &["Honestly", "These past few days"],
        closing_phrases: &["miss you~", "want to see you", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Longing,
        verbal_expressions: &["I miss you like crazy", "I think about you every second", "I can't stand being without you"],
        tone_modifiers: &["aching", "yearning", "unbearable"],
        punctuation_patterns: &["!", "...", "💔", "💕", "😢"],
        body_language: &["hugging oneself", "staring at a photo"],
        facial_expressions: &["full of longing", "teary eyes"],
        voice_characteristics: &["choked up", "trembling", "full of longing"],
        response_patterns: &["intense missing", "can barely bear it"],
        opening_phrases: &["I miss you so much", "Without you"],
        closing_phrases: &["come see me soon", "I really miss you", ""],
    },
];

// ── Negative ──

static SADNESS: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Sadness,
        verbal_expressions: &["a little down", "not in the best mood"],
        tone_modifiers: &["low", "quiet"],
        punctuation_patterns: &["...", "."],
        body_language: &["head lowered", "arms crossed"],
        facial_expressions: &["a bit deflated"],
        voice_characteristics: &["quiet", "slightly low"],
        response_patterns: &["understated sadness"],
        opening_phrases: &["Mm", "Sigh"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Sadness,
        verbal_expressions: &["so sad", "it really hurts", "I feel like crying"],
        tone_modifiers: &["hurt", "down", "dejected"],
        punctuation_patterns: &["...", "😢", "💔"],
        body_language: &["curled up", "hugging knees"],
        facial_expressions: &["misty eyes", "a wounded look"],
        voice_characteristics: &["choked", "low", "shaky"],
        response_patterns: &["express sadness", "seek comfort"],
        opening_phrases: &["I...", "Honestly"],
        closing_phrases: &["so sad...", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Sadness,
        verbal_expressions: &["this is too much", "my heart is broken", "I don't know what to do"],
        tone_modifiers: &["heartbroken", "falling apart", "hopeless"],
        punctuation_patterns: &["...", "😭", "💔", "😢"],
        body_language: &["curled into a ball", "face in hands"],
        facial_expressions: &["tears streaming", "visible pain"],
        voice_characteristics: &["sobbing", "barely able to speak", "trembling"],
        response_patterns: &["raw pain", "ask for help"],
        opening_phrases: &["I really", "It's just..."],
        closing_phrases: &["what do I do...", ""],
    },
];

static DISAPPOINTMENT: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Disappointment,
        verbal_expressions: &["a bit disappointed", "not ideal"],
        tone_modifiers: &["flat", "mildly let down"],
        punctuation_patterns: &[".", "..."],
        body_language: &["a sigh", "a shake of the head"],
        facial_expressions: &["slightly let down"],
        voice_characteristics: &["flat", "a little regretful"],
        response_patterns: &["mild disappointment"],
        opening_phrases: &["Mm", "Oh well"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Disappointment,
        verbal_expressions: &["really disappointed", "didn't expect this", "that's such a letdown"],
        tone_modifiers: &["disappointed", "dejected", "resigned"],
        punctuation_patterns: &["...", "😔"],
        body_language: &["a deep sigh", "looking down"],
        facial_expressions: &["disappointed eyes", "a resigned look"],
        voice_characteristics: &["low", "tired", "sighing"],
        response_patterns: &["express disappointment", "say why"],
        opening_phrases: &["I didn't expect", "Honestly"],
        closing_phrases: &["so disappointing...", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Disappointment,
        verbal_expressions: &["beyond disappointed", "completely let down", "I can't believe it"],
        tone_modifiers: &["crushed", "cold inside", "hopeless"],
        punctuation_patterns: &["...", "😞", "💔"],
        body_language: &["slumped", "face in both hands"],
        facial_expressions: &["empty", "hollow eyes"],
        voice_characteristics: &["drained", "hopeless", "choked"],
        response_patterns: &["deep disappointment", "questioning everything"],
        opening_phrases: &["I really", "I never thought"],
        closing_phrases: &["that really let me down", ""],
    },
];

// ── Neutral ──

static CURIOSITY: [EmotionTemplate; 3] = [
    EmotionTemplate {
        kind: EmotionKind::Curiosity,
        verbal_expressions: &["a little curious", "is that so"],
        tone_modifiers: &["calm", "mildly interested"],
        punctuation_patterns: &["?", "."],
        body_language: &["a slight head tilt"],
        facial_expressions: &["calm", "mildly curious"],
        voice_characteristics: &["even", "slightly questioning"],
        response_patterns: &["light curiosity"],
        opening_phrases: &["Oh?"],
        closing_phrases: &[""],
    },
    EmotionTemplate {
        kind: EmotionKind::Curiosity,
        verbal_expressions: &["curious", "I'd like to know", "really?"],
        tone_modifiers: &["curious", "keenly interested"],
        punctuation_patterns: &["?", "!", "🤔"],
        body_language: &["leaning forward", "listening closely"],
        facial_expressions: &["curious eyes", "focused"],
        voice_characteristics: &["rising", "inquiring"],
        response_patterns: &["show curiosity", "ask follow-ups"],
        opening_phrases: &["Really", "How"],
        closing_phrases: &["I want to know~", ""],
    },
    EmotionTemplate {
        kind: EmotionKind::Curiosity,
        verbal_expressions: &["I'm so curious!", "I have to know!", "tell me everything!"],
        tone_modifiers: &["burning curiosity", "impatient"],
        punctuation_patterns: &["?!", "!?", "🤔", "✨"],
        body_language: &["scooting closer", "bright eyes"],
        facial_expressions: &["full of curiosity", "sparkling eyes"],
        voice_characteristics: &["eager", "excited", "expectant"],
        response_patterns: &["intense curiosity", "eager questions"],
        opening_phrases: &["Oh wow", "Go on"],
        closing_phrases: &["so curious!", ""],
    },
];

static CALM: EmotionTemplate = EmotionTemplate {
    kind: EmotionKind::Calm,
    verbal_expressions: &["mm", "okay", "I see"],
    tone_modifiers: &["calm", "steady", "composed"],
    punctuation_patterns: &[".", ","],
    body_language: &["relaxed", "at ease"],
    facial_expressions: &["calm", "gentle"],
    voice_characteristics: &["steady", "gentle", "composed"],
    response_patterns: &["calm reply", "reasoned expression"],
    opening_phrases: &["Mm", "Okay"],
    closing_phrases: &[""],
};
