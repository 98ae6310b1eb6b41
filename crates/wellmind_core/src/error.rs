//! crates/wellmind_core/src/error.rs
//!
//! The error taxonomy surfaced by the conversation core. Collaborator
//! unavailability (analyzers, generation backend) is absorbed inside the
//! pipeline with documented defaults and never appears here.

/// Errors surfaced to callers of the orchestrator and context operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The user message was empty or whitespace-only. Nothing was persisted
    /// and no analysis ran.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// The session id is unknown to the session store.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// A context already exists for this session id.
    #[error("session '{0}' is already active")]
    SessionAlreadyActive(String),

    /// `start_assessment` was called while another assessment is running.
    #[error("an assessment is already in progress")]
    AssessmentAlreadyInProgress,

    /// An assessment operation was called with no assessment in progress.
    #[error("no assessment is in progress")]
    NoAssessmentInProgress,

    /// An assessment response referenced a question id outside the current
    /// question set.
    #[error("unknown question id '{0}'")]
    UnknownQuestionId(String),

    /// A sender value outside {user, bot} reached a parse boundary.
    #[error("invalid sender '{0}'")]
    InvalidSender(String),

    /// Catch-all for unexpected internal failures during the pipeline. The
    /// durable bot-turn transaction has been rolled back; no internal detail
    /// leaks to the caller.
    #[error("failed to process message")]
    ProcessingFailed,
}
