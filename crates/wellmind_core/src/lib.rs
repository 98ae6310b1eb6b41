pub mod context;
pub mod context_store;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod ports;

pub use context::{AssessmentState, ConversationContext, ProfileAccumulator};
pub use context_store::ContextStore;
pub use domain::{
    AssessmentKind, AssessmentOutcome, AssessmentQuestion, AssessmentScore, BotReply, ChatMessage,
    ChatSession, CompletedAssessment, ContextSummary, CrisisCheck, GenerationReply, IntentResult,
    NewAssessment, NewMessage, Recommendation, RiskLevel, SafetyCheck, Sender, SentimentResult,
    SessionUpdate, StoredMessage, UrgencyLevel,
};
pub use error::ChatError;
pub use orchestrator::{Collaborators, ResponseOrchestrator};
pub use ports::{
    CrisisDetector, GenerationBackend, IntentDetector, PortError, PortResult,
    RecommendationEngine, SentimentAnalyzer, SessionStore,
};
