//! OpenAI-compatible chat-completions client (Groq by default)

use super::error::{classify_http_error, classify_transport_error};
use super::sse::sse_events;
use super::types::ChatRequest;
use super::{InferenceClient, InferenceError, ReplyStream};
use async_trait::async_trait;
use futures::{future, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Chat-completions service over HTTP
pub struct ChatCompletionsClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model_id: String,
}

impl ChatCompletionsClient {
    pub fn new(
        api_key: Option<String>,
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::unclassified(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.into(),
            model_id: model_id.into(),
        })
    }

    fn credential(&self) -> Result<&str, InferenceError> {
        self.api_key
            .as_deref()
            .ok_or_else(InferenceError::missing_credential)
    }

    /// Send the request and return the response once its status is a success.
    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, InferenceError> {
        // Checked before any I/O: a missing key never reaches the network.
        let api_key = self.credential()?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::transport(format!("Failed to read response: {e}")))?;
        Err(error_from_body(status.as_u16(), &body))
    }
}

#[async_trait]
impl InferenceClient for ChatCompletionsClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let mut request = request.clone();
        request.stream = false;

        let response = self.post(&request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::transport(format!("Failed to read response: {e}")))?;

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            InferenceError::unclassified(format!("Failed to parse response: {e} - body: {body}"))
        })?;
        normalize_response(parsed)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ReplyStream, InferenceError> {
        let mut request = request.clone();
        request.stream = true;

        let response = self.post(&request).await?;

        let chunks = sse_events(response)
            .map(|event| {
                event.and_then(|event| match event.event.as_deref() {
                    // Some providers report mid-stream failures as a named event
                    Some("error") => Err(error_from_body(500, &event.data)),
                    _ => decode_stream_data(&event.data),
                })
            })
            .try_take_while(|data| future::ready(Ok(!matches!(data, StreamData::Done))))
            .try_filter_map(|data| {
                future::ready(Ok(match data {
                    StreamData::Delta(Some(text)) if !text.is_empty() => Some(text),
                    _ => None,
                }))
            });

        Ok(Box::pin(chunks))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn error_from_body(status: u16, body: &str) -> InferenceError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(resp) => classify_http_error(status, resp.error.code.as_deref(), &resp.error.message),
        Err(_) => classify_http_error(status, None, body),
    }
}

fn normalize_response(resp: CompletionResponse) -> Result<String, InferenceError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::unclassified("No choices in response"))?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::debug!("Completion truncated at max_tokens");
    }

    Ok(choice.message.content.unwrap_or_default())
}

/// One decoded `data:` payload of a streaming response
#[derive(Debug, PartialEq, Eq)]
enum StreamData {
    Delta(Option<String>),
    Done,
}

fn decode_stream_data(data: &str) -> Result<StreamData, InferenceError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(StreamData::Done);
    }

    if let Ok(err) = serde_json::from_str::<ErrorResponse>(data) {
        return Err(classify_http_error(
            200,
            err.error.code.as_deref(),
            &err.error.message,
        ));
    }

    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        InferenceError::unclassified(format!("Failed to parse stream chunk: {e} - data: {data}"))
    })?;

    Ok(StreamData::Delta(
        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content),
    ))
}

// Wire types

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}
