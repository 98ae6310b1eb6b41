//! Integration tests for the message pipeline, driven against in-process
//! mock implementations of all ports.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use wellmind_core::domain::{
    AssessmentKind, AssessmentScore, AssessmentSnapshot, ChatMessage, ChatSession, CrisisCheck,
    CurrentContext, GenerationReply, IntentResult, IndicatorCounts, NewAssessment, NewMessage,
    Recommendation, RiskLevel, SafetyCheck, Sender, SentimentResult, SessionUpdate, StoredMessage,
    UrgencyLevel, UserProfile,
};
use wellmind_core::domain::GenerationContext;
use wellmind_core::ports::{
    CrisisDetector, GenerationBackend, IntentDetector, PortError, PortResult,
    RecommendationEngine, SentimentAnalyzer, SessionStore,
};
use wellmind_core::{ChatError, Collaborators, ResponseOrchestrator};

//=========================================================================================
// Mock collaborators
//=========================================================================================

#[derive(Default)]
struct MockStore {
    sessions: Mutex<HashMap<String, ChatSession>>,
    messages: Mutex<Vec<StoredMessage>>,
    assessments: Mutex<Vec<NewAssessment>>,
    fail_bot_turn: AtomicBool,
}

impl MockStore {
    fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn user_message_texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.sender == Sender::User)
            .map(|m| m.content.clone())
            .collect()
    }
}

#[async_trait]
impl SessionStore for MockStore {
    async fn create_session(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        is_anonymous: bool,
    ) -> PortResult<ChatSession> {
        let session = ChatSession {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            user_id,
            is_anonymous,
            is_active: true,
            mood_detected: None,
            sentiment_score: None,
            created_at: Utc::now(),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: &str) -> PortResult<ChatSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("session {session_id}")))
    }

    async fn append_message(
        &self,
        session_ref: Uuid,
        message: NewMessage,
    ) -> PortResult<StoredMessage> {
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            session_ref,
            sender: message.sender,
            content: message.content,
            message_type: message.message_type,
            metadata: message.metadata,
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn record_bot_turn(
        &self,
        session_ref: Uuid,
        message: NewMessage,
        update: SessionUpdate,
    ) -> PortResult<StoredMessage> {
        if self.fail_bot_turn.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("transaction aborted".to_string()));
        }
        for session in self.sessions.lock().unwrap().values_mut() {
            if session.id == session_ref {
                session.mood_detected = update.mood_detected.clone();
                session.sentiment_score = update.sentiment_score;
            }
        }
        self.append_message(session_ref, message).await
    }

    async fn messages_for_session(&self, session_ref: Uuid) -> PortResult<Vec<StoredMessage>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_ref == session_ref)
            .cloned()
            .collect())
    }

    async fn end_session(&self, session_id: &str) -> PortResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.is_active = false;
                Ok(())
            }
            None => Err(PortError::NotFound(format!("session {session_id}"))),
        }
    }

    async fn save_assessment(&self, assessment: NewAssessment) -> PortResult<()> {
        self.assessments.lock().unwrap().push(assessment);
        Ok(())
    }
}

struct StaticSentiment(SentimentResult);

#[async_trait]
impl SentimentAnalyzer for StaticSentiment {
    async fn analyze(&self, _text: &str) -> PortResult<SentimentResult> {
        Ok(self.0.clone())
    }
}

struct StaticIntent(IntentResult);

#[async_trait]
impl IntentDetector for StaticIntent {
    async fn detect(&self, _text: &str) -> PortResult<IntentResult> {
        Ok(self.0.clone())
    }
}

struct StaticCrisis(CrisisCheck);

#[async_trait]
impl CrisisDetector for StaticCrisis {
    async fn check(&self, _text: &str) -> PortResult<CrisisCheck> {
        Ok(self.0.clone())
    }
}

struct StaticGeneration(&'static str);

#[async_trait]
impl GenerationBackend for StaticGeneration {
    async fn respond(
        &self,
        _user_message: &str,
        _history: &[ChatMessage],
        _context: &GenerationContext,
        _conversation_type: &str,
    ) -> PortResult<GenerationReply> {
        Ok(GenerationReply {
            response_text: self.0.to_string(),
            safety_check: SafetyCheck {
                is_safe: true,
                confidence: 1.0,
            },
        })
    }

    async fn assessment_questions(&self, kind: AssessmentKind) -> PortResult<Vec<String>> {
        Ok(kind.default_questions())
    }

    async fn score_assessment(
        &self,
        kind: AssessmentKind,
        responses: &BTreeMap<String, u8>,
    ) -> PortResult<AssessmentScore> {
        Ok(AssessmentScore::compute(kind, responses))
    }
}

struct FailingGeneration;

#[async_trait]
impl GenerationBackend for FailingGeneration {
    async fn respond(
        &self,
        _user_message: &str,
        _history: &[ChatMessage],
        _context: &GenerationContext,
        _conversation_type: &str,
    ) -> PortResult<GenerationReply> {
        Err(PortError::Unavailable("backend down".to_string()))
    }

    async fn assessment_questions(&self, _kind: AssessmentKind) -> PortResult<Vec<String>> {
        Err(PortError::Unavailable("backend down".to_string()))
    }

    async fn score_assessment(
        &self,
        _kind: AssessmentKind,
        _responses: &BTreeMap<String, u8>,
    ) -> PortResult<AssessmentScore> {
        Err(PortError::Unavailable("backend down".to_string()))
    }
}

/// Returns `count` recommendations titled rec-1..rec-count.
struct CountingEngine(usize);

#[async_trait]
impl RecommendationEngine for CountingEngine {
    async fn recommend(
        &self,
        _profile: &UserProfile,
        _current: &CurrentContext,
        _assessment: Option<&AssessmentSnapshot>,
    ) -> PortResult<Vec<Recommendation>> {
        Ok((1..=self.0)
            .map(|i| Recommendation {
                title: format!("rec-{i}"),
                category: "relaxation".to_string(),
                description: "take a moment".to_string(),
                duration_minutes: 10,
            })
            .collect())
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn sentiment(risk: RiskLevel) -> SentimentResult {
    SentimentResult {
        label: "neutral".to_string(),
        polarity: 0.0,
        risk_level: risk,
        indicators: IndicatorCounts::default(),
    }
}

fn intent(urgency: UrgencyLevel) -> IntentResult {
    IntentResult {
        primary_intent: "general_question".to_string(),
        confidence: 0.9,
        urgency_level: urgency,
    }
}

fn crisis(is_crisis: bool) -> CrisisCheck {
    CrisisCheck {
        is_crisis,
        keywords: Vec::new(),
        severity: if is_crisis {
            RiskLevel::High
        } else {
            RiskLevel::Low
        },
    }
}

fn orchestrator(
    store: Arc<MockStore>,
    collaborators: Collaborators,
) -> ResponseOrchestrator {
    ResponseOrchestrator::new(store, collaborators)
}

//=========================================================================================
// Pipeline tests
//=========================================================================================

#[tokio::test]
async fn empty_message_persists_nothing() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();

    for text in ["", "   ", "\t\n"] {
        let err = orch.handle_message(&session_id, text).await.unwrap_err();
        assert_eq!(err, ChatError::EmptyMessage);
    }
    assert_eq!(store.message_count(), 0);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store, Collaborators::default());
    let err = orch.handle_message("no-such-session", "hello").await.unwrap_err();
    assert_eq!(err, ChatError::SessionNotFound("no-such-session".to_string()));
}

#[tokio::test]
async fn turn_persists_user_and_bot_messages_with_metadata() {
    let store = Arc::new(MockStore::default());
    let collaborators = Collaborators {
        generation: Some(Arc::new(StaticGeneration("I hear you."))),
        ..Collaborators::default()
    };
    let orch = orchestrator(store.clone(), collaborators);
    let session_id = orch.start_session(None, true).await.unwrap();

    let reply = orch.handle_message(&session_id, "I feel okay").await.unwrap();
    assert_eq!(reply.reply_text, "I hear you.");

    let messages = store.messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert!(messages[0].metadata.is_none());
    assert_eq!(messages[1].sender, Sender::Bot);
    let metadata: serde_json::Value =
        serde_json::from_str(messages[1].metadata.as_ref().unwrap()).unwrap();
    assert_eq!(metadata["conversation_type"], "general_question");
}

#[tokio::test]
async fn backend_failure_still_yields_reply_and_escalation() {
    let store = Arc::new(MockStore::default());
    let collaborators = Collaborators {
        sentiment: Some(Arc::new(StaticSentiment(sentiment(RiskLevel::High)))),
        intent: Some(Arc::new(StaticIntent(intent(UrgencyLevel::Low)))),
        crisis: Some(Arc::new(StaticCrisis(crisis(false)))),
        generation: Some(Arc::new(FailingGeneration)),
        ..Collaborators::default()
    };
    let orch = orchestrator(store, collaborators);
    let session_id = orch.start_session(None, true).await.unwrap();

    let reply = orch
        .handle_message(&session_id, "everything is too much")
        .await
        .unwrap();
    assert!(!reply.reply_text.is_empty());
    // High sentiment risk escalates even though the backend is down.
    assert!(reply.escalation_needed);
}

#[tokio::test]
async fn escalation_gate_covers_all_combinations() {
    for crisis_flag in [false, true] {
        for urgency in [UrgencyLevel::Low, UrgencyLevel::High] {
            for risk in [RiskLevel::Low, RiskLevel::High] {
                let store = Arc::new(MockStore::default());
                let collaborators = Collaborators {
                    sentiment: Some(Arc::new(StaticSentiment(sentiment(risk)))),
                    intent: Some(Arc::new(StaticIntent(intent(urgency)))),
                    crisis: Some(Arc::new(StaticCrisis(crisis(crisis_flag)))),
                    ..Collaborators::default()
                };
                let orch = orchestrator(store, collaborators);
                let session_id = orch.start_session(None, true).await.unwrap();
                let reply = orch.handle_message(&session_id, "hello").await.unwrap();

                let expected = crisis_flag
                    || urgency == UrgencyLevel::High
                    || risk == RiskLevel::High;
                assert_eq!(
                    reply.escalation_needed, expected,
                    "crisis={crisis_flag} urgency={urgency:?} risk={risk:?}"
                );
            }
        }
    }
}

#[tokio::test]
async fn recommendations_are_truncated_to_three() {
    let store = Arc::new(MockStore::default());
    let collaborators = Collaborators {
        intent: Some(Arc::new(StaticIntent(IntentResult {
            primary_intent: "recommendation_request".to_string(),
            confidence: 0.9,
            urgency_level: UrgencyLevel::Low,
        }))),
        recommendations: Some(Arc::new(CountingEngine(5))),
        ..Collaborators::default()
    };
    let orch = orchestrator(store, collaborators);
    let session_id = orch.start_session(None, true).await.unwrap();

    let reply = orch
        .handle_message(&session_id, "what could I try?")
        .await
        .unwrap();
    let titles: Vec<&str> = reply.recommendations.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["rec-1", "rec-2", "rec-3"]);
}

#[tokio::test]
async fn recommendation_gate_stays_closed_on_calm_turns() {
    let store = Arc::new(MockStore::default());
    let collaborators = Collaborators {
        sentiment: Some(Arc::new(StaticSentiment(sentiment(RiskLevel::Low)))),
        intent: Some(Arc::new(StaticIntent(intent(UrgencyLevel::Low)))),
        crisis: Some(Arc::new(StaticCrisis(crisis(false)))),
        recommendations: Some(Arc::new(CountingEngine(5))),
        ..Collaborators::default()
    };
    let orch = orchestrator(store, collaborators);
    let session_id = orch.start_session(None, true).await.unwrap();

    let reply = orch.handle_message(&session_id, "nice weather today").await.unwrap();
    assert!(reply.recommendations.is_empty());
}

#[tokio::test]
async fn bot_turn_persistence_failure_surfaces_processing_failed() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();

    store.fail_bot_turn.store(true, Ordering::SeqCst);
    let err = orch.handle_message(&session_id, "hello").await.unwrap_err();
    assert_eq!(err, ChatError::ProcessingFailed);
    // The user message from step 3 remains; the bot turn rolled back.
    assert_eq!(store.message_count(), 1);
    assert_eq!(store.user_message_texts(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn concurrent_messages_on_one_session_never_interleave() {
    let store = Arc::new(MockStore::default());
    let orch = Arc::new(orchestrator(store.clone(), Collaborators::default()));
    let session_id = orch.start_session(None, true).await.unwrap();

    let a = {
        let orch = orch.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move { orch.handle_message(&session_id, "A").await })
    };
    let b = {
        let orch = orch.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move { orch.handle_message(&session_id, "B").await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let mut user_texts = store.user_message_texts();
    user_texts.sort();
    assert_eq!(user_texts, vec!["A".to_string(), "B".to_string()]);

    // Both turns landed fully in the shared context: 2 user + 2 bot entries.
    let summary = orch.get_context_summary(&session_id).await.unwrap();
    assert_eq!(summary.message_count, 4);
}

#[tokio::test]
async fn context_is_reconstructed_after_eviction() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();
    orch.handle_message(&session_id, "first").await.unwrap();

    let evicted = orch.evict_idle_contexts(chrono::Duration::zero());
    assert_eq!(evicted, 1);

    // The session is still known durably, so the pipeline rebuilds a fresh
    // context and keeps going.
    orch.handle_message(&session_id, "second").await.unwrap();
    let summary = orch.get_context_summary(&session_id).await.unwrap();
    assert_eq!(summary.message_count, 2);
    assert_eq!(store.message_count(), 4);
}

//=========================================================================================
// Assessment flow
//=========================================================================================

#[tokio::test]
async fn assessment_flow_scores_locally_without_backend() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();

    let questions = orch
        .start_assessment(&session_id, AssessmentKind::Phq9)
        .await
        .unwrap();
    assert_eq!(questions.len(), 9);
    assert_eq!(questions[0].id, "q1");

    for question in &questions {
        orch.submit_assessment_response(&session_id, &question.id, 1)
            .await
            .unwrap();
    }
    let completed = orch.complete_assessment(&session_id).await.unwrap();
    assert_eq!(completed.score.total_score, 9);
    assert_eq!(completed.score.severity_level, "mild");

    // Anonymous sessions never persist an assessment record.
    assert!(store.assessments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn attributed_assessments_are_persisted() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let user_id = Uuid::new_v4();
    let session_id = orch.start_session(Some(user_id), false).await.unwrap();

    orch.start_assessment(&session_id, AssessmentKind::Gad7)
        .await
        .unwrap();
    orch.submit_assessment_response(&session_id, "q1", 3)
        .await
        .unwrap();
    orch.complete_assessment(&session_id).await.unwrap();

    let saved = store.assessments.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].user_id, user_id);
    assert_eq!(saved[0].total_score, 3);
}

#[tokio::test]
async fn double_start_and_stray_complete_are_rejected() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store, Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();

    assert_eq!(
        orch.complete_assessment(&session_id).await.unwrap_err(),
        ChatError::NoAssessmentInProgress
    );

    orch.start_assessment(&session_id, AssessmentKind::Phq9)
        .await
        .unwrap();
    assert_eq!(
        orch.start_assessment(&session_id, AssessmentKind::Gad7)
            .await
            .unwrap_err(),
        ChatError::AssessmentAlreadyInProgress
    );
}

#[tokio::test]
async fn ending_a_session_marks_it_inactive_and_drops_context() {
    let store = Arc::new(MockStore::default());
    let orch = orchestrator(store.clone(), Collaborators::default());
    let session_id = orch.start_session(None, true).await.unwrap();
    assert_eq!(orch.active_context_count(), 1);

    orch.end_session(&session_id).await.unwrap();
    assert_eq!(orch.active_context_count(), 0);
    assert!(!store.sessions.lock().unwrap()[&session_id].is_active);

    assert_eq!(
        orch.end_session("missing").await.unwrap_err(),
        ChatError::SessionNotFound("missing".to_string())
    );
}
