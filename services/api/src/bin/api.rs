//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        crisis::KeywordCrisisDetector, db::SqlxStore, generation_llm::OpenAiGenerationAdapter,
        intent::KeywordIntentDetector, recommend::RuleBasedRecommendationEngine,
        sentiment::LexiconSentimentAnalyzer,
    },
    config::Config,
    error::ApiError,
    web::{
        chat::ApiDoc,
        complete_assessment_handler, create_mood_entry_handler, delete_mood_entry_handler,
        end_session_handler, export_history_handler, export_mood_entries_handler,
        get_context_handler, get_history_handler, get_mood_entry_handler,
        list_mood_entries_handler, mood_analytics_handler, send_message_handler,
        start_assessment_handler, start_session_handler, state::AppState,
        submit_assessment_response_handler, update_mood_entry_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use tower_http::cors::CorsLayer;
use axum::http::{Method, HeaderValue, header::{AUTHORIZATION, CONTENT_TYPE, ACCEPT}};
use wellmind_core::{Collaborators, ResponseOrchestrator};

/// How often the background task sweeps idle conversation contexts.
const EVICTION_SWEEP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(SqlxStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Pipeline Collaborators ---
    let generation = match &config.openai_api_key {
        Some(api_key) => {
            let openai_config = OpenAIConfig::new().with_api_key(api_key);
            let openai_client = Client::with_config(openai_config);
            Some(Arc::new(OpenAiGenerationAdapter::new(
                openai_client,
                config.generation_model.clone(),
            )) as _)
        }
        None => {
            warn!("OPENAI_API_KEY not set; replies will use the fallback text");
            None
        }
    };
    let intent_detector = KeywordIntentDetector::new()
        .map_err(|e| ApiError::Internal(format!("Failed to compile intent patterns: {e}")))?;
    let collaborators = Collaborators {
        sentiment: Some(Arc::new(LexiconSentimentAnalyzer::new())),
        intent: Some(Arc::new(intent_detector)),
        crisis: Some(Arc::new(KeywordCrisisDetector::new())),
        generation,
        recommendations: Some(Arc::new(RuleBasedRecommendationEngine::new())),
    };

    let orchestrator = Arc::new(
        ResponseOrchestrator::new(store.clone(), collaborators)
            .with_call_timeout(Duration::from_secs(config.collaborator_timeout_secs)),
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        orchestrator: orchestrator.clone(),
        db: store,
        config: config.clone(),
    });

    // --- 5. Start the Idle-Context Sweeper ---
    let idle_minutes = config.context_idle_minutes;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(EVICTION_SWEEP_SECS));
        loop {
            interval.tick().await;
            orchestrator.evict_idle_contexts(chrono::Duration::minutes(idle_minutes));
        }
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let api_router = Router::new()
        .route("/api/session/start", post(start_session_handler))
        .route("/api/session/{session_id}/message", post(send_message_handler))
        .route("/api/session/{session_id}/end", post(end_session_handler))
        .route("/api/session/{session_id}/history", get(get_history_handler))
        .route(
            "/api/session/{session_id}/history/export",
            get(export_history_handler),
        )
        .route("/api/session/{session_id}/context", get(get_context_handler))
        .route(
            "/api/session/{session_id}/assessment/start",
            post(start_assessment_handler),
        )
        .route(
            "/api/session/{session_id}/assessment/response",
            post(submit_assessment_response_handler),
        )
        .route(
            "/api/session/{session_id}/assessment/complete",
            post(complete_assessment_handler),
        )
        .route(
            "/api/mood/entries",
            post(create_mood_entry_handler).get(list_mood_entries_handler),
        )
        .route(
            "/api/mood/entries/{entry_id}",
            get(get_mood_entry_handler)
                .put(update_mood_entry_handler)
                .delete(delete_mood_entry_handler),
        )
        .route("/api/mood/analytics", get(mood_analytics_handler))
        .route("/api/mood/export", get(export_mood_entries_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
