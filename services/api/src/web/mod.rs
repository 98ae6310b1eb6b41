pub mod chat;
pub mod mood;
pub mod state;

// Re-export the handlers and the OpenAPI definition to make them easily
// accessible to the binary that will build the web server router.
pub use chat::{
    complete_assessment_handler, end_session_handler, export_history_handler, get_context_handler,
    get_history_handler, send_message_handler, start_assessment_handler, start_session_handler,
    submit_assessment_response_handler, ApiDoc,
};
pub use mood::{
    create_mood_entry_handler, delete_mood_entry_handler, export_mood_entries_handler,
    get_mood_entry_handler, list_mood_entries_handler, mood_analytics_handler,
    update_mood_entry_handler,
};
pub use state::AppState;
