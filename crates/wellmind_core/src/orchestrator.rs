//! crates/wellmind_core/src/orchestrator.rs
//!
//! The per-message pipeline coordinator. Given a session and a new user
//! message it runs sentiment/intent/crisis analysis, mutates the
//! conversation context, decides the escalation and recommendation gates,
//! invokes the generation backend and persists the turn.
//!
//! Availability is prioritized over precision: analyzer and backend failures
//! are absorbed with documented defaults so a chat turn never ends without
//! bot-facing text. Only validation errors and persistence failures surface
//! to the caller.

use chrono::{Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ConversationContext;
use crate::context_store::{ContextStore, SharedContext};
use crate::domain::{
    mood_score_from_polarity, stress_level_from_indicators, AssessmentKind, AssessmentQuestion,
    AssessmentScore, AssessmentSnapshot, BotReply, ChatSession, CompletedAssessment, ContextSummary,
    CrisisCheck, CurrentContext, IntentResult, MentalHealthStatus, NewAssessment, NewMessage,
    Recommendation, RiskLevel, Sender, SentimentResult, SessionUpdate, SeverityLevel, StoredMessage,
    TimeOfDay, UrgencyLevel, UserProfile,
};
use crate::error::ChatError;
use crate::ports::{
    CrisisDetector, GenerationBackend, IntentDetector, PortError, PortResult,
    RecommendationEngine, SentimentAnalyzer, SessionStore,
};

/// Fixed supportive reply used when the generation backend is absent or
/// unreachable.
const FALLBACK_REPLY: &str = "Thank you for sharing with me. I'm here to listen and support you. \
    While I may not have all the answers, I want you to know that your feelings are valid and \
    there are resources available to help.";

/// How many turns of history are handed to the generation backend.
const HISTORY_WINDOW: usize = 10;

/// How many recommendations a reply may carry. The full list is still logged.
const MAX_REPLY_RECOMMENDATIONS: usize = 3;

/// Assumed free time for recommendation context, in minutes.
const DEFAULT_AVAILABLE_MINUTES: u32 = 30;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// The optional collaborators the orchestrator drives. Absence is decided
/// once at construction time; a collaborator that is present but unreachable
/// at call time takes the same documented fallback path per call.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub sentiment: Option<Arc<dyn SentimentAnalyzer>>,
    pub intent: Option<Arc<dyn IntentDetector>>,
    pub crisis: Option<Arc<dyn CrisisDetector>>,
    pub generation: Option<Arc<dyn GenerationBackend>>,
    pub recommendations: Option<Arc<dyn RecommendationEngine>>,
}

/// The core coordinator. One instance serves all sessions; per-session
/// mutation is serialized through the injected `ContextStore`.
pub struct ResponseOrchestrator {
    store: Arc<dyn SessionStore>,
    contexts: ContextStore,
    collaborators: Collaborators,
    call_timeout: Duration,
}

impl ResponseOrchestrator {
    pub fn new(store: Arc<dyn SessionStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            contexts: ContextStore::new(),
            collaborators,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the bound on individual collaborator calls.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    //=====================================================================================
    // Session lifecycle
    //=====================================================================================

    /// Starts a new session: creates the durable record and the in-memory
    /// context. The session id is generated server-side, so an id collision
    /// cannot occur through this path; the duplicate check still holds as a
    /// hard invariant.
    pub async fn start_session(
        &self,
        user_id: Option<Uuid>,
        is_anonymous: bool,
    ) -> Result<String, ChatError> {
        let session_id = Uuid::new_v4().to_string();
        let user_id = if is_anonymous { None } else { user_id };
        self.store
            .create_session(&session_id, user_id, is_anonymous)
            .await
            .map_err(|e| {
                warn!("failed to create session record: {e}");
                ChatError::ProcessingFailed
            })?;
        self.contexts
            .insert(ConversationContext::new(session_id.clone(), user_id))?;
        info!(session_id = %session_id, is_anonymous, "chat session started");
        Ok(session_id)
    }

    /// Marks the durable session inactive and drops the in-memory context.
    pub async fn end_session(&self, session_id: &str) -> Result<(), ChatError> {
        match self.store.end_session(session_id).await {
            Ok(()) => {}
            Err(PortError::NotFound(_)) => {
                return Err(ChatError::SessionNotFound(session_id.to_string()))
            }
            Err(e) => {
                warn!("failed to end session {session_id}: {e}");
                return Err(ChatError::ProcessingFailed);
            }
        }
        self.contexts.remove(session_id);
        info!(session_id, "chat session ended");
        Ok(())
    }

    /// Drops contexts idle longer than `max_idle`; the durable session
    /// records are untouched.
    pub fn evict_idle_contexts(&self, max_idle: chrono::Duration) -> usize {
        let evicted = self.contexts.evict_idle(max_idle);
        if evicted > 0 {
            info!(evicted, "evicted idle conversation contexts");
        }
        evicted
    }

    pub fn active_context_count(&self) -> usize {
        self.contexts.len()
    }

    //=====================================================================================
    // The per-message pipeline
    //=====================================================================================

    /// Runs one full message exchange for a session. See the module docs for
    /// the failure policy; the returned error taxonomy is `ChatError`.
    pub async fn handle_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<BotReply, ChatError> {
        // Step 1: validate before any write or analysis.
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // Step 2: resolve the session and its context. Holding the context
        // lock for the rest of the pipeline serializes concurrent calls for
        // the same session.
        let (session, shared) = self.resolve(session_id).await?;
        let mut ctx = shared.lock().await;

        // Step 3: persist the user message before mutating the context, so a
        // crash between the two never loses it from durable storage.
        self.store
            .append_message(session.id, NewMessage::text(Sender::User, text))
            .await
            .map_err(|e| {
                warn!("failed to persist user message for {session_id}: {e}");
                ChatError::ProcessingFailed
            })?;
        ctx.add_message(Sender::User, text);

        // Steps 4–5: both analyzers always run; neither short-circuits the
        // other, and failures collapse to neutral defaults.
        let sentiment = self.analyze_sentiment(text).await;
        let intent = self.detect_intent(text).await;
        let crisis = self.check_crisis(text).await;

        // Step 6: indicator fusion comes straight from the sentiment
        // analyzer's structured output.
        let indicators = sentiment.indicators.clone();
        for (count, label) in [
            (indicators.depression, "depression"),
            (indicators.anxiety, "anxiety"),
            (indicators.stress, "stress"),
        ] {
            if count > 0 {
                ctx.profile_mut().note_challenge(label);
            }
        }

        ctx.update_sentiment(sentiment.clone());
        ctx.update_intent(intent.clone());

        // Step 7: the conversation-type label governing prompt selection.
        let conversation_type = if crisis.is_crisis {
            "crisis".to_string()
        } else if intent.primary_intent.is_empty() {
            "general".to_string()
        } else {
            intent.primary_intent.clone()
        };

        // Step 8: generate the reply, or fall back to the fixed supportive
        // text. Backend failure must never fail the exchange.
        let generation_context = ctx.generation_context();
        let history = ctx.recent_history(HISTORY_WINDOW).to_vec();
        let reply = self
            .generate_reply(text, &history, &generation_context, &conversation_type)
            .await;

        // Step 9: the bot turn is persisted transactionally together with
        // the mirrored session fields and context snapshot.
        ctx.add_message(Sender::Bot, reply.response_text.clone());
        let metadata = serde_json::json!({
            "sentiment": sentiment,
            "intent": intent,
            "crisis_check": crisis,
            "conversation_type": conversation_type,
            "safety_check": reply.safety_check,
        });
        let bot_message = NewMessage {
            sender: Sender::Bot,
            content: reply.response_text.clone(),
            message_type: "text".to_string(),
            metadata: Some(metadata.to_string()),
        };
        let update = SessionUpdate {
            mood_detected: Some(sentiment.label.clone()),
            sentiment_score: Some(sentiment.polarity),
            context_data: ctx.snapshot(),
        };
        self.store
            .record_bot_turn(session.id, bot_message, update)
            .await
            .map_err(|e| {
                warn!("bot-turn transaction rolled back for {session_id}: {e}");
                ChatError::ProcessingFailed
            })?;

        // Step 10: recommendation gate.
        let recommendations = self
            .maybe_recommend(&session, &ctx, text, &sentiment, &intent, &crisis)
            .await;

        // Step 11: escalation is advisory metadata; it triggers no external
        // action here.
        let escalation_needed = crisis.is_crisis
            || intent.urgency_level == UrgencyLevel::High
            || sentiment.risk_level == RiskLevel::High;
        if escalation_needed {
            info!(session_id, conversation_type, "escalation flag raised");
        }

        Ok(BotReply {
            reply_text: reply.response_text,
            sentiment,
            intent,
            crisis_detected: crisis.is_crisis,
            escalation_needed,
            recommendations,
            context_summary: ctx.summary(),
        })
    }

    /// Compact rolling-state view for a session.
    pub async fn get_context_summary(&self, session_id: &str) -> Result<ContextSummary, ChatError> {
        let (_, shared) = self.resolve(session_id).await?;
        let ctx = shared.lock().await;
        Ok(ctx.summary())
    }

    /// Full durable message log for a session, in append order.
    pub async fn session_history(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredMessage>, ChatError> {
        let session = self.find_session(session_id).await?;
        self.store
            .messages_for_session(session.id)
            .await
            .map_err(|e| {
                warn!("failed to load history for {session_id}: {e}");
                ChatError::ProcessingFailed
            })
    }

    //=====================================================================================
    // Assessment sub-flow
    //=====================================================================================

    /// Starts a structured assessment in the session's context. Questions
    /// come from the generation backend when available, otherwise from the
    /// built-in standard sets.
    pub async fn start_assessment(
        &self,
        session_id: &str,
        kind: AssessmentKind,
    ) -> Result<Vec<AssessmentQuestion>, ChatError> {
        let (_, shared) = self.resolve(session_id).await?;
        let questions = match &self.collaborators.generation {
            Some(backend) => match self.timed(backend.assessment_questions(kind)).await {
                Ok(questions) if !questions.is_empty() => questions,
                Ok(_) => kind.default_questions(),
                Err(e) => {
                    warn!("assessment question source unavailable, using built-in set: {e}");
                    kind.default_questions()
                }
            },
            None => kind.default_questions(),
        };
        let mut ctx = shared.lock().await;
        let questions = ctx.start_assessment(kind, questions)?.to_vec();
        info!(session_id, kind = kind.as_str(), "assessment started");
        Ok(questions)
    }

    /// Records one response within the in-progress assessment.
    pub async fn submit_assessment_response(
        &self,
        session_id: &str,
        question_id: &str,
        response: u8,
    ) -> Result<(), ChatError> {
        let (_, shared) = self.resolve(session_id).await?;
        let mut ctx = shared.lock().await;
        ctx.add_assessment_response(question_id, response)
    }

    /// Completes the assessment, scores it, and persists the result when the
    /// session is attributed to a known user. Anonymous assessments are not
    /// persisted by policy.
    pub async fn complete_assessment(
        &self,
        session_id: &str,
    ) -> Result<CompletedAssessment, ChatError> {
        let (_, shared) = self.resolve(session_id).await?;
        let mut ctx = shared.lock().await;
        let outcome = ctx.complete_assessment()?;

        let score = match &self.collaborators.generation {
            Some(backend) => match self
                .timed(backend.score_assessment(outcome.kind, &outcome.responses))
                .await
            {
                Ok(score) => score,
                Err(e) => {
                    warn!("external assessment scoring unavailable, scoring locally: {e}");
                    AssessmentScore::compute(outcome.kind, &outcome.responses)
                }
            },
            None => AssessmentScore::compute(outcome.kind, &outcome.responses),
        };

        if let Some(user_id) = ctx.user_id() {
            let record = NewAssessment {
                user_id,
                kind: outcome.kind,
                responses: serde_json::to_string(&outcome.responses)
                    .unwrap_or_else(|_| "{}".to_string()),
                total_score: score.total_score,
                severity_level: score.severity_level.clone(),
            };
            self.store.save_assessment(record).await.map_err(|e| {
                warn!("failed to persist assessment for {session_id}: {e}");
                ChatError::ProcessingFailed
            })?;
        }

        info!(
            session_id,
            kind = outcome.kind.as_str(),
            total_score = score.total_score,
            "assessment completed"
        );
        Ok(CompletedAssessment {
            kind: outcome.kind,
            score,
            completed_at: outcome.completed_at,
        })
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    async fn find_session(&self, session_id: &str) -> Result<ChatSession, ChatError> {
        match self.store.find_session(session_id).await {
            Ok(session) => Ok(session),
            Err(PortError::NotFound(_)) => {
                Err(ChatError::SessionNotFound(session_id.to_string()))
            }
            Err(e) => {
                warn!("session lookup failed for {session_id}: {e}");
                Err(ChatError::ProcessingFailed)
            }
        }
    }

    /// Resolves a session and its in-memory context, reconstructing a fresh
    /// context from the stored user id when none is in memory.
    async fn resolve(
        &self,
        session_id: &str,
    ) -> Result<(ChatSession, SharedContext), ChatError> {
        let session = self.find_session(session_id).await?;
        let shared = self.contexts.get_or_insert_with(session_id, || {
            debug!(session_id, "reconstructing conversation context");
            ConversationContext::new(session_id, session.user_id)
        });
        Ok((session, shared))
    }

    /// Bounds a collaborator call; a timeout is the documented
    /// "collaborator failure" path, not a fatal error.
    async fn timed<T>(
        &self,
        fut: impl std::future::Future<Output = PortResult<T>>,
    ) -> PortResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Unavailable("call timed out".to_string())),
        }
    }

    async fn analyze_sentiment(&self, text: &str) -> SentimentResult {
        let Some(analyzer) = &self.collaborators.sentiment else {
            return SentimentResult::default();
        };
        match self.timed(analyzer.analyze(text)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("sentiment analyzer unavailable, using neutral default: {e}");
                SentimentResult::default()
            }
        }
    }

    async fn detect_intent(&self, text: &str) -> IntentResult {
        let Some(detector) = &self.collaborators.intent else {
            return IntentResult::default();
        };
        match self.timed(detector.detect(text)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("intent detector unavailable, using default intent: {e}");
                IntentResult::default()
            }
        }
    }

    async fn check_crisis(&self, text: &str) -> CrisisCheck {
        let Some(detector) = &self.collaborators.crisis else {
            return CrisisCheck::default();
        };
        match self.timed(detector.check(text)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("crisis detector unavailable, defaulting to no crisis: {e}");
                CrisisCheck::default()
            }
        }
    }

    async fn generate_reply(
        &self,
        user_message: &str,
        history: &[crate::domain::ChatMessage],
        context: &crate::domain::GenerationContext,
        conversation_type: &str,
    ) -> crate::domain::GenerationReply {
        let fallback = || crate::domain::GenerationReply {
            response_text: FALLBACK_REPLY.to_string(),
            safety_check: crate::domain::SafetyCheck {
                is_safe: true,
                confidence: 1.0,
            },
        };
        let Some(backend) = &self.collaborators.generation else {
            return fallback();
        };
        match self
            .timed(backend.respond(user_message, history, context, conversation_type))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("generation backend unavailable, using fallback reply: {e}");
                fallback()
            }
        }
    }

    async fn maybe_recommend(
        &self,
        session: &ChatSession,
        ctx: &ConversationContext,
        text: &str,
        sentiment: &SentimentResult,
        intent: &IntentResult,
        crisis: &CrisisCheck,
    ) -> Vec<Recommendation> {
        let indicators = &sentiment.indicators;
        let should_recommend = intent.primary_intent == "recommendation_request"
            || matches!(sentiment.risk_level, RiskLevel::Medium | RiskLevel::High)
            || indicators.total() > 2
            || crisis.is_crisis;
        if !should_recommend {
            return Vec::new();
        }
        let Some(engine) = &self.collaborators.recommendations else {
            return Vec::new();
        };

        let profile = UserProfile {
            user_id: session.user_id,
            mental_health_status: MentalHealthStatus::from_indicators(indicators),
            mood_score: mood_score_from_polarity(sentiment.polarity),
            stress_level: stress_level_from_indicators(indicators),
            preferences: ctx.profile().preferences.clone(),
            successful_activities: ctx.profile().successful_activities.clone(),
            goals: ctx.profile().goals.clone(),
            current_challenges: ctx.profile().current_challenges.clone(),
        };
        let current = CurrentContext {
            current_mood: sentiment.label.clone(),
            time_of_day: TimeOfDay::from_hour(Utc::now().hour()),
            available_minutes: DEFAULT_AVAILABLE_MINUTES,
            user_message: text.to_string(),
            indicators: indicators.clone(),
            crisis_detected: crisis.is_crisis,
        };
        let snapshot = AssessmentSnapshot {
            risk_level: sentiment.risk_level,
            severity_level: SeverityLevel::from_indicators(indicators),
            indicators: indicators.clone(),
        };

        match self
            .timed(engine.recommend(&profile, &current, Some(&snapshot)))
            .await
        {
            Ok(list) => {
                debug!(total = list.len(), "recommendation engine returned");
                list.into_iter().take(MAX_REPLY_RECOMMENDATIONS).collect()
            }
            Err(e) => {
                warn!("recommendation engine unavailable, returning none: {e}");
                Vec::new()
            }
        }
    }
}
