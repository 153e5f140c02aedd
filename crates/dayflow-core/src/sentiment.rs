//! Lexical + mood-weighted sentiment over reflections.
//!
//! Keywords match as lower-cased substrings (so `frustrat` covers "frustrated" and
//! "frustrating"), each keyword counting at most once per reflection.

pub const POSITIVE_KEYWORDS: [&str; 10] = [
    "good",
    "great",
    "focused",
    "productive",
    "completed",
    "success",
    "happy",
    "energized",
    "better",
    "improved",
];

pub const NEGATIVE_KEYWORDS: [&str; 10] = [
    "tired",
    "missed",
    "failed",
    "struggle",
    "worse",
    "sad",
    "angry",
    "frustrat",
    "anxious",
    "overwhelmed",
];

/// Per-reflection score bound.
const LOCAL_LIMIT: f64 = 3.0;

/// One reflection as seen by the scorer. Both fields are optional.
#[derive(Debug, Clone, Default)]
pub struct SentimentInput<'a> {
    pub mood: Option<u8>,
    pub text: Option<&'a str>,
}

impl<'a> SentimentInput<'a> {
    pub fn new(mood: Option<u8>, text: Option<&'a str>) -> Self {
        Self { mood, text }
    }
}

/// Score in -1.0 (negative) ..= 1.0 (positive). Exactly 0.0 for an empty slice.
pub fn analyze_sentiment(reflections: &[SentimentInput<'_>]) -> f64 {
    if reflections.is_empty() {
        return 0.0;
    }
    let total: f64 = reflections.iter().map(local_score).sum();
    let normalized = total / (reflections.len() as f64 * LOCAL_LIMIT);
    normalized.clamp(-1.0, 1.0)
}

fn local_score(r: &SentimentInput<'_>) -> f64 {
    let text = r.text.unwrap_or("").to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|w| text.contains(*w)).count() as f64;
    let negative = NEGATIVE_KEYWORDS.iter().filter(|w| text.contains(*w)).count() as f64;
    // mood 3 is neutral; 5 => +1, 1 => -1
    let mood = r.mood.map(|m| (f64::from(m) - 3.0) / 2.0).unwrap_or(0.0);
    (positive - negative + mood).clamp(-LOCAL_LIMIT, LOCAL_LIMIT)
}
