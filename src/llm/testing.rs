//! Scripted inference client for tests
//!
//! Replies are queued up front; every request is recorded so tests can
//! assert on the exact message list the session assembled.

use super::{ChatRequest, InferenceClient, InferenceError, ReplyStream};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One queued reply
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Full reply; streamed as the given chunks
    Reply(Vec<String>),
    /// Fails before any chunk
    Error(InferenceError),
    /// Streams the chunks, then fails
    BrokenStream(Vec<String>, InferenceError),
}

pub struct ScriptedClient {
    replies: Mutex<VecDeque<Scripted>>,
    model_id: String,
    delay: Option<Duration>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, so tests can act while a turn is in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a reply delivered as a single chunk when streamed
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.queue(Scripted::Reply(vec![text.into()]));
    }

    /// Queue a reply split into chunks
    pub fn queue_chunks(&self, chunks: &[&str]) {
        self.queue(Scripted::Reply(
            chunks.iter().map(|c| (*c).to_string()).collect(),
        ));
    }

    pub fn queue_error(&self, error: InferenceError) {
        self.queue(Scripted::Error(error));
    }

    pub fn queue(&self, scripted: Scripted) {
        self.replies.lock().unwrap().push_back(scripted);
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn next(&self, request: &ChatRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::Error(InferenceError::transport("No scripted reply queued")));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        match self.next(request).await {
            Scripted::Reply(chunks) => Ok(chunks.concat()),
            Scripted::Error(e) | Scripted::BrokenStream(_, e) => Err(e),
        }
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ReplyStream, InferenceError> {
        let items: Vec<Result<String, InferenceError>> = match self.next(request).await {
            Scripted::Reply(chunks) => chunks.into_iter().map(Ok).collect(),
            Scripted::Error(e) => return Err(e),
            Scripted::BrokenStream(chunks, e) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(e)))
                .collect(),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
