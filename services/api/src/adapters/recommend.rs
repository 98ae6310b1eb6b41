//! services/api/src/adapters/recommend.rs
//!
//! A rule-based implementation of the `RecommendationEngine` port. Maps the
//! user's profile, the current turn and any assessment snapshot to a ranked
//! list of concrete activities. Crisis resources always come first.

use async_trait::async_trait;
use wellmind_core::domain::{
    AssessmentSnapshot, CurrentContext, Recommendation, RiskLevel, TimeOfDay, UserProfile,
};
use wellmind_core::ports::{PortResult, RecommendationEngine};

fn rec(title: &str, category: &str, description: &str, duration_minutes: u32) -> Recommendation {
    Recommendation {
        title: title.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        duration_minutes,
    }
}

#[derive(Clone, Default)]
pub struct RuleBasedRecommendationEngine;

impl RuleBasedRecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    fn crisis_items() -> Vec<Recommendation> {
        vec![
            rec(
                "Reach out to a crisis line",
                "crisis_support",
                "Call or text a crisis line right now, such as the 988 Suicide & Crisis Lifeline. Trained counselors are available around the clock.",
                5,
            ),
            rec(
                "Contact someone you trust",
                "crisis_support",
                "Call a friend, family member or anyone you trust and let them know how you're feeling. You don't have to manage this alone.",
                10,
            ),
        ]
    }

    fn build(
        &self,
        profile: &UserProfile,
        current: &CurrentContext,
        assessment: Option<&AssessmentSnapshot>,
    ) -> Vec<Recommendation> {
        let mut items = Vec::new();

        if current.crisis_detected
            || current.indicators.crisis > 0
            || assessment
                .map(|a| a.risk_level == RiskLevel::High)
                .unwrap_or(false)
        {
            items.extend(Self::crisis_items());
        }

        let indicators = assessment
            .map(|a| a.indicators.clone())
            .unwrap_or_else(|| current.indicators.clone());

        if indicators.depression > 0 {
            items.push(rec(
                "Behavioral activation",
                "mood",
                "Pick one small activity you used to enjoy and do it for ten minutes, even if you don't feel like it. Action tends to come before motivation.",
                10,
            ));
            items.push(rec(
                "Get some daylight",
                "mood",
                "Step outside or sit by a window for a few minutes. Light exposure has a real effect on low mood.",
                15,
            ));
        }
        if indicators.anxiety > 0 {
            items.push(rec(
                "Box breathing",
                "anxiety_relief",
                "Breathe in for four counts, hold for four, out for four, hold for four. Repeat for a few minutes to settle your nervous system.",
                5,
            ));
            items.push(rec(
                "Grounding with 5-4-3-2-1",
                "anxiety_relief",
                "Name five things you can see, four you can hear, three you can touch, two you can smell and one you can taste.",
                5,
            ));
        }
        if indicators.stress > 0 || profile.stress_level >= 7 {
            items.push(rec(
                "Brain dump",
                "stress_management",
                "Write down everything on your mind for five minutes without editing. Getting it on paper makes it easier to sort.",
                5,
            ));
            items.push(rec(
                "Progressive muscle relaxation",
                "stress_management",
                "Tense and release each muscle group from your feet up to your shoulders, a few seconds each.",
                10,
            ));
        }
        if profile.mood_score <= 3 {
            items.push(rec(
                "Message a friend",
                "social",
                "Send a short message to someone you like hearing from. Connection is one of the most reliable mood lifters.",
                5,
            ));
        }

        match current.time_of_day {
            TimeOfDay::Night => items.push(rec(
                "Wind-down routine",
                "sleep",
                "Dim the lights, put screens away and do something quiet for twenty minutes before bed.",
                20,
            )),
            TimeOfDay::Morning => items.push(rec(
                "Morning walk",
                "physical",
                "A short walk before the day starts lifts mood and energy for hours.",
                20,
            )),
            _ => {}
        }

        // General items pad out the list so there is always something to offer.
        if items.len() < 3 {
            items.push(rec(
                "Mindful minute",
                "mindfulness",
                "Sit comfortably and follow your breath for one minute. When your mind wanders, gently come back.",
                1,
            ));
        }
        if items.len() < 3 {
            items.push(rec(
                "Gratitude note",
                "mindfulness",
                "Write down one thing that went okay today, however small.",
                5,
            ));
        }
        if items.len() < 3 {
            items.push(rec(
                "Stretch break",
                "physical",
                "Stand up and stretch your neck, shoulders and back for a couple of minutes.",
                5,
            ));
        }

        items.retain(|item| item.duration_minutes <= current.available_minutes.max(5));
        items
    }
}

#[async_trait]
impl RecommendationEngine for RuleBasedRecommendationEngine {
    async fn recommend(
        &self,
        profile: &UserProfile,
        current: &CurrentContext,
        assessment: Option<&AssessmentSnapshot>,
    ) -> PortResult<Vec<Recommendation>> {
        Ok(self.build(profile, current, assessment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellmind_core::domain::{IndicatorCounts, MentalHealthStatus};

    fn profile() -> UserProfile {
        UserProfile {
            user_id: None,
            mental_health_status: MentalHealthStatus::Healthy,
            mood_score: 5,
            stress_level: 2,
            preferences: Default::default(),
            successful_activities: vec![],
            goals: vec![],
            current_challenges: vec![],
        }
    }

    fn current(indicators: IndicatorCounts, crisis: bool) -> CurrentContext {
        CurrentContext {
            current_mood: "neutral".to_string(),
            time_of_day: TimeOfDay::Afternoon,
            available_minutes: 30,
            user_message: "hello".to_string(),
            indicators,
            crisis_detected: crisis,
        }
    }

    #[test]
    fn crisis_items_come_first() {
        let indicators = IndicatorCounts {
            depression: 1,
            anxiety: 0,
            stress: 0,
            crisis: 1,
        };
        let items =
            RuleBasedRecommendationEngine::new().build(&profile(), &current(indicators, true), None);
        assert_eq!(items[0].category, "crisis_support");
        assert_eq!(items[1].category, "crisis_support");
    }

    #[test]
    fn calm_context_still_yields_three_items() {
        let items = RuleBasedRecommendationEngine::new().build(
            &profile(),
            &current(IndicatorCounts::default(), false),
            None,
        );
        assert!(items.len() >= 3);
    }

    #[test]
    fn heavy_indicators_can_exceed_three_items() {
        let indicators = IndicatorCounts {
            depression: 2,
            anxiety: 2,
            stress: 2,
            crisis: 0,
        };
        let items = RuleBasedRecommendationEngine::new()
            .build(&profile(), &current(indicators, false), None);
        assert!(items.len() > 3);
    }

    #[test]
    fn long_activities_are_dropped_when_time_is_short() {
        let indicators = IndicatorCounts {
            depression: 1,
            anxiety: 0,
            stress: 0,
            crisis: 0,
        };
        let mut ctx = current(indicators, false);
        ctx.available_minutes = 10;
        let items = RuleBasedRecommendationEngine::new().build(&profile(), &ctx, None);
        assert!(items.iter().all(|i| i.duration_minutes <= 10));
    }
}
