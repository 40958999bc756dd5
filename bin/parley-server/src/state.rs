//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use parley_core::ChatRelay;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Conversation histories and the completion client.
    pub relay: Arc<ChatRelay>,
}
