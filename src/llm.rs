//! Model backend abstraction
//!
//! The orchestrator talks to the model through [`ModelBackend`]: a
//! request/response call plus a cheap existence probe for continuation handles.

mod error;
mod openai;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiResponsesBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for model backends
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Issue one request
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError>;

    /// Check that a continuation handle still resolves on the backend
    async fn probe(&self, response_id: &str) -> Result<(), LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: ModelBackend + ?Sized> ModelBackend for Arc<T> {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        (**self).send(request).await
    }

    async fn probe(&self, response_id: &str) -> Result<(), LlmError> {
        (**self).probe(response_id).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for model backends
pub struct LoggingBackend {
    inner: Arc<dyn ModelBackend>,
    model_id: String,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn ModelBackend>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ModelBackend for LoggingBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    response_id = %response.id,
                    chained = request.previous_response_id.is_some(),
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Model request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Model request failed"
                );
            }
        }

        result
    }

    async fn probe(&self, response_id: &str) -> Result<(), LlmError> {
        let result = self.inner.probe(response_id).await;
        if let Err(e) = &result {
            tracing::debug!(response_id, error = %e, "Continuation probe failed");
        }
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
