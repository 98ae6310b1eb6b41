pub mod crisis;
pub mod db;
pub mod generation_llm;
pub mod intent;
pub mod recommend;
pub mod sentiment;

pub use crisis::KeywordCrisisDetector;
pub use db::SqlxStore;
pub use generation_llm::OpenAiGenerationAdapter;
pub use intent::KeywordIntentDetector;
pub use recommend::RuleBasedRecommendationEngine;
pub use sentiment::LexiconSentimentAnalyzer;
