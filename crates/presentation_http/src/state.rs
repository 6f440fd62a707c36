//! Shared application state

use std::sync::Arc;

use ai_core::ChatCompletions;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Upstream chat-completions client
    pub client: Arc<dyn ChatCompletions>,
}

impl AppState {
    pub fn new(client: Arc<dyn ChatCompletions>) -> Self {
        Self { client }
    }
}
