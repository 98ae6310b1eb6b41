//! services/api/src/adapters/intent.rs
//!
//! A keyword/regex implementation of the `IntentDetector` port. Rules are
//! checked in priority order; the first match wins.

use async_trait::async_trait;
use regex::Regex;
use wellmind_core::domain::{IntentResult, UrgencyLevel};
use wellmind_core::ports::{IntentDetector, PortResult};

/// Pattern-based intent detector. Patterns compile once at construction.
pub struct KeywordIntentDetector {
    rules: Vec<(Regex, &'static str, f32)>,
    urgency_high: Regex,
    urgency_medium: Regex,
}

impl KeywordIntentDetector {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            (
                Regex::new(
                    r"(?i)(what (should|can|could) i (do|try))|recommend|suggest|\b(tips|advice|activities|activity)\b",
                )?,
                "recommendation_request",
                0.85,
            ),
            (
                Regex::new(r"(?i)(help me|need help|need support|therapist|counselor|how (do|can) i cope|coping)")?,
                "seeking_help",
                0.8,
            ),
            (
                Regex::new(r"(?i)(i feel|i'm feeling|i am feeling|so tired of|fed up|can't stand|frustrated)")?,
                "venting",
                0.75,
            ),
            (
                Regex::new(r"(?i)^\s*(hi|hello|hey|good (morning|afternoon|evening))\b")?,
                "greeting",
                0.9,
            ),
        ];
        let urgency_high =
            Regex::new(r"(?i)(right now|immediately|urgent|emergency|can't take|cannot take)")?;
        let urgency_medium = Regex::new(r"(?i)(soon|today|really need|getting worse)")?;
        Ok(Self {
            rules,
            urgency_high,
            urgency_medium,
        })
    }

    fn detect_sync(&self, text: &str) -> IntentResult {
        let urgency_level = if self.urgency_high.is_match(text) {
            UrgencyLevel::High
        } else if self.urgency_medium.is_match(text) {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        };

        for (pattern, intent, confidence) in &self.rules {
            if pattern.is_match(text) {
                return IntentResult {
                    primary_intent: (*intent).to_string(),
                    confidence: *confidence,
                    urgency_level,
                };
            }
        }
        IntentResult {
            urgency_level,
            ..IntentResult::default()
        }
    }
}

#[async_trait]
impl IntentDetector for KeywordIntentDetector {
    async fn detect(&self, text: &str) -> PortResult<IntentResult> {
        Ok(self.detect_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> KeywordIntentDetector {
        KeywordIntentDetector::new().unwrap()
    }

    #[test]
    fn recommendation_requests_are_detected() {
        let result = detector().detect_sync("what should I do to feel better?");
        assert_eq!(result.primary_intent, "recommendation_request");
    }

    #[test]
    fn greeting_only_matches_at_start() {
        let result = detector().detect_sync("Hello there");
        assert_eq!(result.primary_intent, "greeting");
        let result = detector().detect_sync("I said hello to nobody and i feel ignored");
        assert_eq!(result.primary_intent, "venting");
    }

    #[test]
    fn unmatched_text_falls_back_to_general_question() {
        let result = detector().detect_sync("is the sky blue?");
        assert_eq!(result.primary_intent, "general_question");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn urgency_keywords_raise_urgency() {
        let result = detector().detect_sync("I need help right now");
        assert_eq!(result.urgency_level, UrgencyLevel::High);
        let result = detector().detect_sync("things are getting worse");
        assert_eq!(result.urgency_level, UrgencyLevel::Medium);
    }
}
