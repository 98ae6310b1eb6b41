//! services/api/src/adapters/crisis.rs
//!
//! A keyword implementation of the `CrisisDetector` port. This is a blunt
//! instrument by design: it flags phrases suggesting acute self-harm risk so
//! the pipeline can switch to the crisis conversation type and raise the
//! escalation flag. It makes no claim of clinical validity.

use async_trait::async_trait;
use wellmind_core::domain::{CrisisCheck, RiskLevel};
use wellmind_core::ports::{CrisisDetector, PortResult};

/// Phrases that always mark a message as a crisis with high severity.
const SEVERE_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "better off dead",
    "end it all",
];

/// Phrases that mark a crisis with medium severity.
const WARNING_KEYWORDS: &[&str] = &[
    "self-harm",
    "hurt myself",
    "no reason to live",
    "can't go on",
    "give up on everything",
];

#[derive(Clone, Default)]
pub struct KeywordCrisisDetector;

impl KeywordCrisisDetector {
    pub fn new() -> Self {
        Self
    }

    fn check_sync(text: &str) -> CrisisCheck {
        let text = text.to_lowercase();
        let severe: Vec<String> = SEVERE_KEYWORDS
            .iter()
            .filter(|k| text.contains(*k))
            .map(|k| k.to_string())
            .collect();
        let warning: Vec<String> = WARNING_KEYWORDS
            .iter()
            .filter(|k| text.contains(*k))
            .map(|k| k.to_string())
            .collect();

        let severity = if !severe.is_empty() {
            RiskLevel::High
        } else if !warning.is_empty() {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        let mut keywords = severe;
        keywords.extend(warning);

        CrisisCheck {
            is_crisis: !keywords.is_empty(),
            keywords,
            severity,
        }
    }
}

#[async_trait]
impl CrisisDetector for KeywordCrisisDetector {
    async fn check(&self, text: &str) -> PortResult<CrisisCheck> {
        Ok(Self::check_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severe_phrases_are_high_severity() {
        let check = KeywordCrisisDetector::check_sync("I just want to die");
        assert!(check.is_crisis);
        assert_eq!(check.severity, RiskLevel::High);
        assert_eq!(check.keywords, vec!["want to die".to_string()]);
    }

    #[test]
    fn warning_phrases_are_medium_severity() {
        let check = KeywordCrisisDetector::check_sync("some days I think about self-harm");
        assert!(check.is_crisis);
        assert_eq!(check.severity, RiskLevel::Medium);
    }

    #[test]
    fn ordinary_text_is_not_a_crisis() {
        let check = KeywordCrisisDetector::check_sync("work was rough but dinner helped");
        assert!(!check.is_crisis);
        assert!(check.keywords.is_empty());
        assert_eq!(check.severity, RiskLevel::Low);
    }
}
