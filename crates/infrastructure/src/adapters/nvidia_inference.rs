//! NVIDIA-backed inference adapter

use std::sync::Arc;

use ai_core::{ChatCompletions, ChatRequest, UpstreamError, delta_stream};
use application::error::ApplicationError;
use application::ports::{InferencePort, TokenStream};
use async_trait::async_trait;
use domain::Conversation;
use futures::StreamExt;

/// Puts the chat-completions client behind the application's inference
/// port, translating upstream errors into application terms.
pub struct NvidiaInference {
    client: Arc<dyn ChatCompletions>,
    model: String,
}

impl NvidiaInference {
    pub fn new(client: Arc<dyn ChatCompletions>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn map_upstream(err: UpstreamError) -> ApplicationError {
    match err {
        UpstreamError::Rejected { status: 429, .. } => ApplicationError::RateLimited,
        UpstreamError::Connection(_) | UpstreamError::Timeout(_) => {
            ApplicationError::ExternalService(err.to_string())
        }
        UpstreamError::MissingCredential => ApplicationError::Configuration(err.to_string()),
        UpstreamError::Rejected { .. }
        | UpstreamError::InvalidResponse(_)
        | UpstreamError::Stream(_) => {
            ApplicationError::Inference(err.to_string())
        }
    }
}

#[async_trait]
impl InferencePort for NvidiaInference {
    async fn generate(&self, conversation: &Conversation) -> Result<String, ApplicationError> {
        let request = ChatRequest::from_conversation(conversation);
        self.client.complete(request).await.map_err(map_upstream)
    }

    async fn generate_stream(
        &self,
        conversation: &Conversation,
    ) -> Result<TokenStream, ApplicationError> {
        let request = ChatRequest::from_conversation(conversation);
        let bytes = self
            .client
            .complete_stream(request)
            .await
            .map_err(map_upstream)?;
        let deltas = delta_stream(bytes).map(|item| item.map_err(map_upstream));
        Ok(Box::pin(deltas))
    }

    async fn is_healthy(&self) -> bool {
        self.client.has_credential()
    }

    fn current_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use ai_core::ByteStream;
    use domain::Conversation;

    use super::*;

    struct StubClient {
        reply: String,
    }

    #[async_trait]
    impl ChatCompletions for StubClient {
        async fn complete(&self, _request: ChatRequest) -> Result<String, UpstreamError> {
            Ok(self.reply.clone())
        }

        async fn complete_stream(&self, _request: ChatRequest) -> Result<ByteStream, UpstreamError> {
            Err(UpstreamError::Rejected {
                status: 429,
                message: "slow down".to_string(),
                details: None,
            })
        }

        fn has_credential(&self) -> bool {
            true
        }

        fn credential_hint(&self) -> Option<String> {
            Some("nvapi-...abcd".to_string())
        }
    }

    #[tokio::test]
    async fn generate_delegates_to_the_client() {
        let adapter = NvidiaInference::new(
            Arc::new(StubClient {
                reply: "hello".to_string(),
            }),
            "test-model",
        );
        let conversation = Conversation::with_system_prompt("be brief");
        assert_eq!(adapter.generate(&conversation).await.unwrap(), "hello");
        assert!(adapter.is_healthy().await);
        assert_eq!(adapter.current_model(), "test-model");
    }

    #[tokio::test]
    async fn rate_limits_map_to_the_retryable_variant() {
        let adapter = NvidiaInference::new(
            Arc::new(StubClient {
                reply: String::new(),
            }),
            "test-model",
        );
        let conversation = Conversation::with_system_prompt("be brief");
        let Err(err) = adapter.generate_stream(&conversation).await else {
            panic!("expected a rate-limit error");
        };
        assert!(matches!(err, ApplicationError::RateLimited));
        assert!(err.is_retryable());
    }
}
