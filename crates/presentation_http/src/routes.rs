//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/nvidia", get(handlers::health::health_nvidia))
        .route("/login", post(handlers::login::login))
        .route("/api/nvidia/chat", post(handlers::chat::chat))
        .with_state(state)
}
