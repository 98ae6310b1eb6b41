//! crates/wellmind_core/src/context.rs
//!
//! The per-session conversation state machine: rolling message history,
//! latest analysis summaries, the assessment sub-state and a best-effort
//! user-profile accumulator. One `ConversationContext` exists in memory per
//! active session; it is advisory state and is lost on restart (the durable
//! session/message log lives behind the `SessionStore` port).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{
    AssessmentKind, AssessmentOutcome, AssessmentQuestion, ChatMessage, ContextSummary,
    GenerationContext, IntentResult, Sender, SentimentResult,
};
use crate::error::ChatError;

/// Sub-state present only while an assessment is in progress.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentState {
    pub kind: AssessmentKind,
    pub questions: Vec<AssessmentQuestion>,
    pub responses: BTreeMap<String, u8>,
    pub started_at: DateTime<Utc>,
}

/// Best-effort accumulation of user preferences, goals and activities.
/// Populated only through the explicit `note_*` methods; never authoritative.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileAccumulator {
    pub preferences: BTreeMap<String, String>,
    pub goals: Vec<String>,
    pub successful_activities: Vec<String>,
    pub current_challenges: Vec<String>,
}

impl ProfileAccumulator {
    pub fn note_preference(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.preferences.insert(key.into(), value.into());
    }

    pub fn note_goal(&mut self, goal: impl Into<String>) {
        let goal = goal.into();
        if !self.goals.contains(&goal) {
            self.goals.push(goal);
        }
    }

    pub fn note_successful_activity(&mut self, activity: impl Into<String>) {
        let activity = activity.into();
        if !self.successful_activities.contains(&activity) {
            self.successful_activities.push(activity);
        }
    }

    pub fn note_challenge(&mut self, challenge: impl Into<String>) {
        let challenge = challenge.into();
        if !self.current_challenges.contains(&challenge) {
            self.current_challenges.push(challenge);
        }
    }
}

/// The in-memory rolling state for one chat session.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationContext {
    session_id: String,
    user_id: Option<Uuid>,
    history: Vec<ChatMessage>,
    sentiment: Option<SentimentResult>,
    intent: Option<IntentResult>,
    assessment: Option<AssessmentState>,
    profile: ProfileAccumulator,
    started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>, user_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id,
            history: Vec::new(),
            sentiment: None,
            intent: None,
            assessment: None,
            profile: ProfileAccumulator::default(),
            started_at: now,
            last_active: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Appends a message to the history. History is append-only; past
    /// entries are never reordered or mutated.
    pub fn add_message(&mut self, sender: Sender, text: impl Into<String>) {
        let now = Utc::now();
        self.history.push(ChatMessage {
            sender,
            text: text.into(),
            timestamp: now,
        });
        self.last_active = now;
    }

    /// Replaces the rolling sentiment summary with the latest result.
    pub fn update_sentiment(&mut self, result: SentimentResult) {
        self.sentiment = Some(result);
    }

    /// Replaces the rolling intent summary with the latest result.
    pub fn update_intent(&mut self, result: IntentResult) {
        self.intent = Some(result);
    }

    pub fn profile_mut(&mut self) -> &mut ProfileAccumulator {
        &mut self.profile
    }

    pub fn profile(&self) -> &ProfileAccumulator {
        &self.profile
    }

    /// The most recent `limit` turns, in append order.
    pub fn recent_history(&self, limit: usize) -> &[ChatMessage] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    //=====================================================================================
    // Assessment state machine
    //=====================================================================================

    /// Transitions to `AssessmentInProgress`, assigning ids (`q1`, `q2`, ...)
    /// to the supplied questions in order.
    pub fn start_assessment(
        &mut self,
        kind: AssessmentKind,
        questions: Vec<String>,
    ) -> Result<&[AssessmentQuestion], ChatError> {
        if self.assessment.is_some() {
            return Err(ChatError::AssessmentAlreadyInProgress);
        }
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(i, text)| AssessmentQuestion {
                id: format!("q{}", i + 1),
                text,
            })
            .collect();
        self.last_active = Utc::now();
        let state = self.assessment.insert(AssessmentState {
            kind,
            questions,
            responses: BTreeMap::new(),
            started_at: self.last_active,
        });
        Ok(&state.questions)
    }

    /// Records (or overwrites) the response for one question of the current
    /// assessment.
    pub fn add_assessment_response(
        &mut self,
        question_id: &str,
        response: u8,
    ) -> Result<(), ChatError> {
        let state = self
            .assessment
            .as_mut()
            .ok_or(ChatError::NoAssessmentInProgress)?;
        if !state.questions.iter().any(|q| q.id == question_id) {
            return Err(ChatError::UnknownQuestionId(question_id.to_string()));
        }
        state.responses.insert(question_id.to_string(), response);
        self.last_active = Utc::now();
        Ok(())
    }

    /// Snapshots the responses, clears the sub-state and returns to `Idle`.
    /// Unanswered questions are simply absent from the map; partial
    /// assessments are the caller's to interpret.
    pub fn complete_assessment(&mut self) -> Result<AssessmentOutcome, ChatError> {
        let state = self
            .assessment
            .take()
            .ok_or(ChatError::NoAssessmentInProgress)?;
        self.last_active = Utc::now();
        Ok(AssessmentOutcome {
            kind: state.kind,
            responses: state.responses,
            started_at: state.started_at,
            completed_at: Utc::now(),
        })
    }

    pub fn assessment_in_progress(&self) -> bool {
        self.assessment.is_some()
    }

    //=====================================================================================
    // Projections
    //=====================================================================================

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            session_id: self.session_id.clone(),
            message_count: self.history.len(),
            current_sentiment: self.sentiment.as_ref().map(|s| s.label.clone()),
            current_risk: self.sentiment.as_ref().map(|s| s.risk_level),
            current_intent: self.intent.as_ref().map(|i| i.primary_intent.clone()),
            assessment_in_progress: self.assessment.is_some(),
        }
    }

    /// Produces the immutable projection handed to the generation backend.
    /// Pure; no mutation.
    pub fn generation_context(&self) -> GenerationContext {
        GenerationContext {
            summary: self.summary(),
            sentiment: self.sentiment.clone(),
            intent: self.intent.clone(),
            preferences: self.profile.preferences.clone(),
            goals: self.profile.goals.clone(),
            current_challenges: self.profile.current_challenges.clone(),
        }
    }

    /// Serializes the context into the lossy mirror written to the durable
    /// session record after every turn.
    pub fn snapshot(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ConversationContext {
        ConversationContext::new("s-1", None)
    }

    #[test]
    fn history_grows_by_one_per_message_in_call_order() {
        let mut ctx = context();
        for i in 0..5 {
            ctx.add_message(Sender::User, format!("message {i}"));
        }
        assert_eq!(ctx.message_count(), 5);
        let texts: Vec<&str> = ctx.recent_history(10).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
    }

    #[test]
    fn recent_history_is_bounded() {
        let mut ctx = context();
        for i in 0..15 {
            ctx.add_message(Sender::Bot, format!("m{i}"));
        }
        let recent = ctx.recent_history(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].text, "m5");
    }

    #[test]
    fn start_assessment_assigns_ordered_question_ids() {
        let mut ctx = context();
        let questions = ctx
            .start_assessment(
                AssessmentKind::Gad7,
                vec!["first?".to_string(), "second?".to_string()],
            )
            .unwrap();
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[1].id, "q2");
        assert!(ctx.assessment_in_progress());
    }

    #[test]
    fn start_assessment_twice_fails_without_overwriting() {
        let mut ctx = context();
        ctx.start_assessment(AssessmentKind::Phq9, vec!["a?".to_string()])
            .unwrap();
        ctx.add_assessment_response("q1", 3).unwrap();
        let err = ctx
            .start_assessment(AssessmentKind::Gad7, vec!["b?".to_string()])
            .unwrap_err();
        assert_eq!(err, ChatError::AssessmentAlreadyInProgress);
        // The original assessment survives untouched.
        let outcome = ctx.complete_assessment().unwrap();
        assert_eq!(outcome.kind, AssessmentKind::Phq9);
        assert_eq!(outcome.responses.get("q1"), Some(&3));
    }

    #[test]
    fn assessment_response_without_assessment_fails() {
        let mut ctx = context();
        let err = ctx.add_assessment_response("q1", 2).unwrap_err();
        assert_eq!(err, ChatError::NoAssessmentInProgress);
    }

    #[test]
    fn unknown_question_id_is_rejected() {
        let mut ctx = context();
        ctx.start_assessment(AssessmentKind::Phq9, vec!["a?".to_string()])
            .unwrap();
        let err = ctx.add_assessment_response("q9", 2).unwrap_err();
        assert_eq!(err, ChatError::UnknownQuestionId("q9".to_string()));
    }

    #[test]
    fn complete_without_assessment_fails() {
        let mut ctx = context();
        assert_eq!(
            ctx.complete_assessment().unwrap_err(),
            ChatError::NoAssessmentInProgress
        );
    }

    #[test]
    fn complete_returns_partial_responses_and_goes_idle() {
        let mut ctx = context();
        ctx.start_assessment(
            AssessmentKind::Gad7,
            vec!["a?".to_string(), "b?".to_string(), "c?".to_string()],
        )
        .unwrap();
        ctx.add_assessment_response("q1", 1).unwrap();
        ctx.add_assessment_response("q3", 2).unwrap();
        // Overwriting an earlier response keeps the latest value.
        ctx.add_assessment_response("q1", 3).unwrap();

        let outcome = ctx.complete_assessment().unwrap();
        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.responses.get("q1"), Some(&3));
        assert!(!outcome.responses.contains_key("q2"));
        assert!(!ctx.assessment_in_progress());

        // Back in Idle, a new assessment may start.
        ctx.start_assessment(AssessmentKind::Phq9, vec!["x?".to_string()])
            .unwrap();
    }

    #[test]
    fn summaries_are_overwritten_not_accumulated() {
        let mut ctx = context();
        ctx.update_sentiment(SentimentResult {
            label: "negative".to_string(),
            polarity: -0.8,
            ..SentimentResult::default()
        });
        ctx.update_sentiment(SentimentResult::default());
        let summary = ctx.summary();
        assert_eq!(summary.current_sentiment.as_deref(), Some("neutral"));
    }

    #[test]
    fn snapshot_is_valid_json() {
        let mut ctx = context();
        ctx.add_message(Sender::User, "hello");
        let snapshot = ctx.snapshot();
        let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(value["session_id"], "s-1");
    }
}
