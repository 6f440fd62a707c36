//! Inference port - interface for LLM inference

use std::pin::Pin;

use async_trait::async_trait;
use domain::Conversation;
use futures::Stream;

use crate::error::ApplicationError;

/// Token deltas from a streaming reply
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ApplicationError>> + Send>>;

/// Port for inference operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferencePort: Send + Sync {
    /// Generate a complete reply for the conversation
    async fn generate(&self, conversation: &Conversation) -> Result<String, ApplicationError>;

    /// Generate a reply as a stream of token deltas.
    ///
    /// Dropping the stream cancels the upstream request.
    async fn generate_stream(
        &self,
        conversation: &Conversation,
    ) -> Result<TokenStream, ApplicationError>;

    /// Check if the inference backend is reachable and has credentials
    async fn is_healthy(&self) -> bool;

    /// Get the name of the current model
    fn current_model(&self) -> &str;
}
