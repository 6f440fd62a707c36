//! HTTP proxy surface for Parley
//!
//! A thin axum layer in front of the upstream chat client: health probes, a
//! username-only login stub, and the `/api/nvidia/chat` proxy with buffered
//! and SSE-passthrough modes.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
