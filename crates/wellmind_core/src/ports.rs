//! crates/wellmind_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the conversation core.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or model backends.

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{
    AssessmentKind, AssessmentScore, AssessmentSnapshot, ChatMessage, ChatSession, CrisisCheck,
    CurrentContext, GenerationContext, GenerationReply, IntentResult, NewAssessment, NewMessage,
    Recommendation, SentimentResult, SessionUpdate, StoredMessage, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services
/// (e.g., database, model backend, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Analysis Ports
//=========================================================================================

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    /// Classifies the sentiment of a raw user message.
    async fn analyze(&self, text: &str) -> PortResult<SentimentResult>;
}

#[async_trait]
pub trait IntentDetector: Send + Sync {
    /// Detects the primary intent and urgency of a raw user message.
    async fn detect(&self, text: &str) -> PortResult<IntentResult>;
}

#[async_trait]
pub trait CrisisDetector: Send + Sync {
    /// Flags acute self-harm risk based on the raw message text.
    async fn check(&self, text: &str) -> PortResult<CrisisCheck>;
}

//=========================================================================================
// Generation and Recommendation Ports
//=========================================================================================

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produces the conversational reply for one turn. `conversation_type`
    /// governs prompt selection and is opaque beyond its label contract.
    async fn respond(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        context: &GenerationContext,
        conversation_type: &str,
    ) -> PortResult<GenerationReply>;

    /// Supplies the question set for a structured assessment.
    async fn assessment_questions(&self, kind: AssessmentKind) -> PortResult<Vec<String>>;

    /// Scores a completed (possibly partial) assessment.
    async fn score_assessment(
        &self,
        kind: AssessmentKind,
        responses: &BTreeMap<String, u8>,
    ) -> PortResult<AssessmentScore>;
}

#[async_trait]
pub trait RecommendationEngine: Send + Sync {
    /// Returns a ranked list of suggested activities and resources.
    async fn recommend(
        &self,
        profile: &UserProfile,
        current: &CurrentContext,
        assessment: Option<&AssessmentSnapshot>,
    ) -> PortResult<Vec<Recommendation>>;
}

//=========================================================================================
// Session Store Port
//=========================================================================================

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates the durable session record for a freshly started session.
    async fn create_session(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        is_anonymous: bool,
    ) -> PortResult<ChatSession>;

    /// Looks up a session by its opaque string id.
    async fn find_session(&self, session_id: &str) -> PortResult<ChatSession>;

    /// Appends a single message to the durable log.
    async fn append_message(
        &self,
        session_ref: Uuid,
        message: NewMessage,
    ) -> PortResult<StoredMessage>;

    /// Persists the bot message and the mirrored session fields in one
    /// transaction: either both commit or neither does.
    async fn record_bot_turn(
        &self,
        session_ref: Uuid,
        message: NewMessage,
        update: SessionUpdate,
    ) -> PortResult<StoredMessage>;

    /// Returns all messages for a session in append order.
    async fn messages_for_session(&self, session_ref: Uuid) -> PortResult<Vec<StoredMessage>>;

    /// Marks a session inactive.
    async fn end_session(&self, session_id: &str) -> PortResult<()>;

    /// Persists a scored assessment for an attributed user.
    async fn save_assessment(&self, assessment: NewAssessment) -> PortResult<()>;
}
