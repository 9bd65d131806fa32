//! API request and response types

use crate::config::HistoryScope;
use crate::history::Turn;
use crate::samples::Example;
use crate::state_machine::TurnState;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// False when the input was blank and nothing happened
    pub accepted: bool,
    /// False when the history was cleared before the reply arrived
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<Turn>,
    pub state: TurnState,
}

/// Response for a new session id
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub scope: HistoryScope,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response for the example snippet list
#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub examples: Vec<Example>,
}

/// Configured model and sampling parameters
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub streaming: bool,
    pub history_scope: HistoryScope,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
