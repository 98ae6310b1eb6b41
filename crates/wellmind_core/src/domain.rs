//! crates/wellmind_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP framework; the only
//! serialization they carry is `serde`, used at the wire and snapshot edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Messages and Sessions
//=========================================================================================

/// Who authored a chat message. A closed enum, so an invalid sender can only
/// appear at a deserialization boundary, never inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = crate::error::ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "bot" => Ok(Sender::Bot),
            other => Err(crate::error::ChatError::InvalidSender(other.to_string())),
        }
    }
}

/// One turn in the in-memory conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// The durable session record, owned by the `SessionStore`.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub session_id: String,
    pub user_id: Option<Uuid>,
    pub is_anonymous: bool,
    pub is_active: bool,
    pub mood_detected: Option<String>,
    pub sentiment_score: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// A durable, append-only message record.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_ref: Uuid,
    pub sender: Sender,
    pub content: String,
    pub message_type: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message the orchestrator hands to the store for persistence.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: Sender,
    pub content: String,
    pub message_type: String,
    pub metadata: Option<String>,
}

impl NewMessage {
    pub fn text(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            message_type: "text".to_string(),
            metadata: None,
        }
    }
}

/// The mirrored session fields updated after every bot turn.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub mood_detected: Option<String>,
    pub sentiment_score: Option<f32>,
    /// Serialized snapshot of the in-memory context. A lossy best-effort
    /// mirror, never the source of truth while the process is alive.
    pub context_data: String,
}

//=========================================================================================
// Analysis Results
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

/// Per-category mental-health indicator counts, sourced from the sentiment
/// analyzer's structured output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorCounts {
    pub depression: u32,
    pub anxiety: u32,
    pub stress: u32,
    pub crisis: u32,
}

impl IndicatorCounts {
    pub fn total(&self) -> u32 {
        self.depression + self.anxiety + self.stress + self.crisis
    }
}

/// Output contract of the `SentimentAnalyzer` port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    /// Polarity in [-1, 1].
    pub polarity: f32,
    pub risk_level: RiskLevel,
    pub indicators: IndicatorCounts,
}

impl Default for SentimentResult {
    /// The documented neutral default substituted when the analyzer is
    /// absent or unreachable.
    fn default() -> Self {
        Self {
            label: "neutral".to_string(),
            polarity: 0.0,
            risk_level: RiskLevel::Low,
            indicators: IndicatorCounts::default(),
        }
    }
}

/// Output contract of the `IntentDetector` port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub primary_intent: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub urgency_level: UrgencyLevel,
}

impl Default for IntentResult {
    /// The documented default substituted when the detector is absent or
    /// unreachable.
    fn default() -> Self {
        Self {
            primary_intent: "general_question".to_string(),
            confidence: 0.5,
            urgency_level: UrgencyLevel::Low,
        }
    }
}

/// Output contract of the `CrisisDetector` port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisCheck {
    pub is_crisis: bool,
    pub keywords: Vec<String>,
    pub severity: RiskLevel,
}

impl Default for CrisisCheck {
    fn default() -> Self {
        Self {
            is_crisis: false,
            keywords: Vec::new(),
            severity: RiskLevel::Low,
        }
    }
}

/// The generation backend's safety verdict on its own reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub is_safe: bool,
    pub confidence: f32,
}

/// Output contract of the `GenerationBackend::respond` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReply {
    pub response_text: String,
    pub safety_check: SafetyCheck,
}

//=========================================================================================
// Fusion of analysis results
//=========================================================================================

/// Coarse status derived from indicator counts, used to shape the profile
/// handed to the recommendation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentalHealthStatus {
    Crisis,
    Depression,
    Anxiety,
    Stress,
    Healthy,
}

impl MentalHealthStatus {
    pub fn from_indicators(indicators: &IndicatorCounts) -> Self {
        if indicators.crisis > 0 {
            MentalHealthStatus::Crisis
        } else if indicators.depression > 3 {
            MentalHealthStatus::Depression
        } else if indicators.anxiety > 3 {
            MentalHealthStatus::Anxiety
        } else if indicators.stress > 3 {
            MentalHealthStatus::Stress
        } else {
            MentalHealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
}

impl SeverityLevel {
    pub fn from_indicators(indicators: &IndicatorCounts) -> Self {
        let total = indicators.total();
        if total > 8 {
            SeverityLevel::Severe
        } else if total > 4 {
            SeverityLevel::Moderate
        } else {
            SeverityLevel::Mild
        }
    }
}

/// Maps a polarity in [-1, 1] onto the 0–10 mood scale used by the
/// recommendation engine and the mood tracker.
pub fn mood_score_from_polarity(polarity: f32) -> u8 {
    let scaled = (polarity.clamp(-1.0, 1.0) + 1.0) * 5.0;
    scaled.round() as u8
}

/// Scales a raw 0–5 stress indicator count onto the 0–10 stress scale.
pub fn stress_level_from_indicators(indicators: &IndicatorCounts) -> u8 {
    (indicators.stress.min(5) * 2) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Buckets a wall-clock hour: morning 5–11, afternoon 12–16,
    /// evening 17–20, night otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

//=========================================================================================
// Recommendation inputs and outputs
//=========================================================================================

/// The best-effort profile handed to the recommendation engine. Derived from
/// the current turn's analysis plus the context's accumulator; never
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Option<Uuid>,
    pub mental_health_status: MentalHealthStatus,
    pub mood_score: u8,
    pub stress_level: u8,
    pub preferences: BTreeMap<String, String>,
    pub successful_activities: Vec<String>,
    pub goals: Vec<String>,
    pub current_challenges: Vec<String>,
}

/// Snapshot of the moment the recommendation is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentContext {
    pub current_mood: String,
    pub time_of_day: TimeOfDay,
    pub available_minutes: u32,
    pub user_message: String,
    pub indicators: IndicatorCounts,
    pub crisis_detected: bool,
}

/// Assessment-shaped input for the recommendation engine, fused from the
/// current turn when no formal assessment has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    pub risk_level: RiskLevel,
    pub severity_level: SeverityLevel,
    pub indicators: IndicatorCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub category: String,
    pub description: String,
    pub duration_minutes: u32,
}

//=========================================================================================
// Assessments
//=========================================================================================

/// The structured questionnaires the chatbot can administer in-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentKind {
    #[serde(rename = "PHQ-9")]
    Phq9,
    #[serde(rename = "GAD-7")]
    Gad7,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Phq9 => "PHQ-9",
            AssessmentKind::Gad7 => "GAD-7",
        }
    }

    /// The standard question set, used when the generation backend cannot
    /// supply one.
    pub fn default_questions(&self) -> Vec<String> {
        let questions: &[&str] = match self {
            AssessmentKind::Phq9 => &[
                "Little interest or pleasure in doing things?",
                "Feeling down, depressed, or hopeless?",
                "Trouble falling or staying asleep, or sleeping too much?",
                "Feeling tired or having little energy?",
                "Poor appetite or overeating?",
                "Feeling bad about yourself, or that you are a failure?",
                "Trouble concentrating on things, such as reading or watching television?",
                "Moving or speaking noticeably slowly, or being fidgety or restless?",
                "Thoughts that you would be better off dead, or of hurting yourself?",
            ],
            AssessmentKind::Gad7 => &[
                "Feeling nervous, anxious, or on edge?",
                "Not being able to stop or control worrying?",
                "Worrying too much about different things?",
                "Trouble relaxing?",
                "Being so restless that it is hard to sit still?",
                "Becoming easily annoyed or irritable?",
                "Feeling afraid, as if something awful might happen?",
            ],
        };
        questions.iter().map(|q| q.to_string()).collect()
    }
}

impl std::str::FromStr for AssessmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "PHQ-9" | "PHQ9" => Ok(AssessmentKind::Phq9),
            "GAD-7" | "GAD7" => Ok(AssessmentKind::Gad7),
            other => Err(format!("unknown assessment type: {other}")),
        }
    }
}

/// A question within an in-progress assessment, with its generated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub id: String,
    pub text: String,
}

/// Snapshot returned by `ConversationContext::complete_assessment`.
/// Unanswered questions are simply absent from the response map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentOutcome {
    pub kind: AssessmentKind,
    pub responses: BTreeMap<String, u8>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Scored result of a completed assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub total_score: u32,
    pub severity_level: String,
    pub recommendations: Vec<String>,
}

impl AssessmentScore {
    /// Local scoring over the standard 0–3 response scale, used when the
    /// external scoring function is absent or unreachable.
    pub fn compute(kind: AssessmentKind, responses: &BTreeMap<String, u8>) -> Self {
        let total_score: u32 = responses.values().map(|v| u32::from(*v)).sum();
        let severity_level = match kind {
            AssessmentKind::Phq9 => match total_score {
                0..=4 => "minimal",
                5..=9 => "mild",
                10..=14 => "moderate",
                15..=19 => "moderately_severe",
                _ => "severe",
            },
            AssessmentKind::Gad7 => match total_score {
                0..=4 => "minimal",
                5..=9 => "mild",
                10..=14 => "moderate",
                _ => "severe",
            },
        }
        .to_string();

        let recommendations = match severity_level.as_str() {
            "minimal" => vec!["Keep up the habits that are working for you".to_string()],
            "mild" => vec![
                "Consider regular mood tracking to spot patterns".to_string(),
                "Light physical activity can help maintain your mood".to_string(),
            ],
            _ => vec![
                "Consider talking to a mental health professional".to_string(),
                "Reach out to someone you trust about how you are feeling".to_string(),
            ],
        };

        Self {
            total_score,
            severity_level,
            recommendations,
        }
    }
}

/// A scored assessment ready for persistence. Only attributed (non-anonymous)
/// sessions produce these.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub user_id: Uuid,
    pub kind: AssessmentKind,
    pub responses: String,
    pub total_score: u32,
    pub severity_level: String,
}

//=========================================================================================
// Orchestrator outputs
//=========================================================================================

/// Compact view of a session's rolling state, safe to hand to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub session_id: String,
    pub message_count: usize,
    pub current_sentiment: Option<String>,
    pub current_risk: Option<RiskLevel>,
    pub current_intent: Option<String>,
    pub assessment_in_progress: bool,
}

/// Immutable projection of a context handed to the generation backend.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationContext {
    pub summary: ContextSummary,
    pub sentiment: Option<SentimentResult>,
    pub intent: Option<IntentResult>,
    pub preferences: BTreeMap<String, String>,
    pub goals: Vec<String>,
    pub current_challenges: Vec<String>,
}

/// The structured reply from one `handle_message` pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct BotReply {
    pub reply_text: String,
    pub sentiment: SentimentResult,
    pub intent: IntentResult,
    pub crisis_detected: bool,
    pub escalation_needed: bool,
    pub recommendations: Vec<Recommendation>,
    pub context_summary: ContextSummary,
}

/// Result of the assessment completion flow.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedAssessment {
    pub kind: AssessmentKind,
    pub score: AssessmentScore,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_score_scaling_matches_polarity_bounds() {
        assert_eq!(mood_score_from_polarity(1.0), 10);
        assert_eq!(mood_score_from_polarity(-1.0), 0);
        assert_eq!(mood_score_from_polarity(0.0), 5);
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(13), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Night);
    }

    #[test]
    fn stress_level_is_doubled_and_capped() {
        let mut indicators = IndicatorCounts::default();
        indicators.stress = 3;
        assert_eq!(stress_level_from_indicators(&indicators), 6);
        indicators.stress = 9;
        assert_eq!(stress_level_from_indicators(&indicators), 10);
    }

    #[test]
    fn phq9_scoring_bands() {
        let mut responses = BTreeMap::new();
        for i in 1..=9 {
            responses.insert(format!("q{i}"), 2u8);
        }
        let score = AssessmentScore::compute(AssessmentKind::Phq9, &responses);
        assert_eq!(score.total_score, 18);
        assert_eq!(score.severity_level, "moderately_severe");
    }

    #[test]
    fn status_fusion_prefers_crisis() {
        let indicators = IndicatorCounts {
            depression: 5,
            anxiety: 0,
            stress: 0,
            crisis: 1,
        };
        assert_eq!(
            MentalHealthStatus::from_indicators(&indicators),
            MentalHealthStatus::Crisis
        );
    }
}
