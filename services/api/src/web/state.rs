//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::SqlxStore;
use crate::config::Config;
use std::sync::Arc;
use wellmind_core::ResponseOrchestrator;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub db: Arc<SqlxStore>,
    pub config: Arc<Config>,
}
