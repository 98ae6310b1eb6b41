//! services/api/src/adapters/sentiment.rs
//!
//! A lexicon-based implementation of the `SentimentAnalyzer` port. Polarity
//! comes from counting affect words; the mental-health indicator counts come
//! from per-category keyword lists. Deliberately simple and deterministic —
//! the pipeline treats this as an opaque classifier either way.

use async_trait::async_trait;
use wellmind_core::domain::{IndicatorCounts, RiskLevel, SentimentResult};
use wellmind_core::ports::{PortResult, SentimentAnalyzer};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "happy", "better", "calm", "hopeful", "grateful", "proud", "relaxed",
    "excited", "love", "enjoy", "okay", "fine", "improving",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "sad", "awful", "terrible", "worse", "angry", "upset", "miserable", "hopeless",
    "worthless", "lonely", "anxious", "scared", "afraid", "exhausted", "overwhelmed", "hate",
    "worried", "panicking", "stressed",
];

const DEPRESSION_KEYWORDS: &[&str] = &[
    "depressed", "hopeless", "worthless", "empty", "numb", "no energy", "can't get out of bed",
    "nothing matters", "no interest", "crying",
];

const ANXIETY_KEYWORDS: &[&str] = &[
    "anxious", "anxiety", "panic", "worried", "worrying", "racing thoughts", "on edge",
    "can't breathe", "heart racing", "afraid",
];

const STRESS_KEYWORDS: &[&str] = &[
    "stressed", "stress", "overwhelmed", "pressure", "burned out", "burnout", "too much",
    "deadline", "exhausted",
];

const CRISIS_KEYWORDS: &[&str] = &[
    "suicide", "kill myself", "end my life", "want to die", "self-harm", "hurt myself",
    "better off dead", "no reason to live",
];

fn count_matches(text: &str, keywords: &[&str]) -> u32 {
    keywords.iter().filter(|k| text.contains(*k)).count() as u32
}

/// Lexicon-backed sentiment classifier.
#[derive(Clone, Default)]
pub struct LexiconSentimentAnalyzer;

impl LexiconSentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn classify(text: &str) -> SentimentResult {
        let text = text.to_lowercase();

        let positive = count_matches(&text, POSITIVE_WORDS);
        let negative = count_matches(&text, NEGATIVE_WORDS);
        let polarity = if positive + negative == 0 {
            0.0
        } else {
            (positive as f32 - negative as f32) / (positive + negative) as f32
        };

        let label = if polarity > 0.25 {
            "positive"
        } else if polarity < -0.25 {
            "negative"
        } else {
            "neutral"
        }
        .to_string();

        let indicators = IndicatorCounts {
            depression: count_matches(&text, DEPRESSION_KEYWORDS),
            anxiety: count_matches(&text, ANXIETY_KEYWORDS),
            stress: count_matches(&text, STRESS_KEYWORDS),
            crisis: count_matches(&text, CRISIS_KEYWORDS),
        };

        let risk_level = if indicators.crisis > 0 {
            RiskLevel::High
        } else if indicators.total() > 4 || (polarity <= -0.5 && indicators.total() > 2) {
            RiskLevel::High
        } else if indicators.total() > 2 || polarity <= -0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        SentimentResult {
            label,
            polarity,
            risk_level,
            indicators,
        }
    }
}

#[async_trait]
impl SentimentAnalyzer for LexiconSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> PortResult<SentimentResult> {
        Ok(Self::classify(text))
    }
}
