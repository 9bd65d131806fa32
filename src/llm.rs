//! Inference client abstraction
//!
//! The boundary to the hosted chat-completion model. Transport failures are
//! translated into a typed [`InferenceError`] here; callers decide how to
//! present them.

mod chat_completions;
mod error;
mod sse;
mod types;

#[cfg(test)]
pub mod testing;

pub use chat_completions::{ChatCompletionsClient, DEFAULT_ENDPOINT};
pub use error::{missing_credential_message, InferenceError, InferenceErrorKind, API_KEY_ENV_VAR};
pub use types::*;

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Lazy, finite, non-restartable sequence of reply chunks.
///
/// Consumed once; dropping it abandons the exchange.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, InferenceError>> + Send>>;

/// Common interface for inference endpoints
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Request a full reply
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError>;

    /// Request a reply as incremental text chunks
    async fn stream(&self, request: &ChatRequest) -> Result<ReplyStream, InferenceError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: InferenceClient + ?Sized> InferenceClient for Arc<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        (**self).complete(request).await
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ReplyStream, InferenceError> {
        (**self).stream(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for inference clients
pub struct LoggingClient {
    inner: Arc<dyn InferenceClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn InferenceClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }

    fn log_failure(&self, duration: Duration, e: &InferenceError) {
        log_failure(&self.model_id, duration, e);
    }
}

fn log_failure(model_id: &str, duration: Duration, e: &InferenceError) {
    tracing::error!(
        model = %model_id,
        duration_ms = %duration.as_millis(),
        error = %e.message,
        kind = e.kind.as_str(),
        "Inference request failed"
    );
}

/// Reply stream that logs the exchange once it ends, fails or is dropped
struct LoggedStream {
    inner: ReplyStream,
    model_id: String,
    start: Instant,
    chunks: usize,
    reply_chars: usize,
    done: bool,
}

impl LoggedStream {
    fn new(inner: ReplyStream, model_id: String, start: Instant) -> Self {
        Self {
            inner,
            model_id,
            start,
            chunks: 0,
            reply_chars: 0,
            done: false,
        }
    }
}

impl Stream for LoggedStream {
    type Item = Result<String, InferenceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);
        if self.done {
            return polled;
        }
        match &polled {
            Poll::Ready(Some(Ok(text))) => {
                self.chunks += 1;
                self.reply_chars += text.chars().count();
            }
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                log_failure(&self.model_id, self.start.elapsed(), e);
            }
            Poll::Ready(None) => {
                self.done = true;
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %self.start.elapsed().as_millis(),
                    chunks = self.chunks,
                    reply_chars = self.reply_chars,
                    "Inference stream completed"
                );
            }
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for LoggedStream {
    fn drop(&mut self) {
        if !self.done {
            tracing::info!(
                model = %self.model_id,
                duration_ms = %self.start.elapsed().as_millis(),
                chunks = self.chunks,
                reply_chars = self.reply_chars,
                "Inference stream abandoned"
            );
        }
    }
}

#[async_trait]
impl InferenceClient for LoggingClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let start = Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    reply_chars = reply.chars().count(),
                    "Inference request completed"
                );
            }
            Err(e) => self.log_failure(duration, e),
        }

        result
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ReplyStream, InferenceError> {
        let start = Instant::now();
        match self.inner.stream(request).await {
            Ok(stream) => {
                tracing::debug!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    messages = request.messages.len(),
                    "Inference stream opened"
                );
                Ok(Box::pin(LoggedStream::new(stream, self.model_id.clone(), start)))
            }
            Err(e) => {
                self.log_failure(start.elapsed(), &e);
                Err(e)
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
