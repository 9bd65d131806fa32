//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, ExamplesResponse, ModelsResponse,
    NewSessionResponse, SuccessResponse,
};
use super::AppState;
use crate::samples::EXAMPLES;
use crate::session::{ChatSession, SessionSnapshot, SubmitOutcome};
use crate::state_machine::TransitionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

const MAX_SESSION_ID_LEN: usize = 128;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session ids
        .route("/api/sessions", post(new_session))
        // Page-load sync
        .route("/api/sessions/:id/history", get(get_history))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/clear", post(clear_session))
        // Static info
        .route("/api/examples", get(list_examples))
        .route("/api/models", get(list_models))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn new_session(State(state): State<AppState>) -> Json<NewSessionResponse> {
    Json(NewSessionResponse {
        session_id: state.sessions.create_session().await,
        scope: state.sessions.scope(),
    })
}

fn validate_id(id: &str) -> Result<(), AppError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid session id: {id:?}")))
    }
}

/// Existing session only; reads never create one
async fn lookup(state: &AppState, id: &str) -> Result<Option<Arc<ChatSession>>, AppError> {
    validate_id(id)?;
    Ok(state.sessions.get(id).await)
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, &id).await?;
    let snapshot = match session {
        Some(session) => session.snapshot().await,
        None => SessionSnapshot::empty(id),
    };
    Ok(Json(snapshot))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = lookup(&state, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;
    let (snapshot, broadcast_rx) = session.watch().await;
    tracing::debug!(session = %session.id(), turns = snapshot.turns.len(), "SSE client connected");
    Ok(sse_stream(snapshot, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_id(&id)?;
    let session = state.sessions.get_or_create(&id).await;

    // Run the turn on its own task so a disconnecting client cannot leave it
    // half-finished
    let turn_session = session.clone();
    let outcome = tokio::spawn(async move { turn_session.submit(&req.text).await })
        .await
        .map_err(|e| AppError::Internal(format!("Turn task failed: {e}")))?
        .map_err(|e| match e {
            TransitionError::Busy => AppError::Conflict(e.to_string()),
            TransitionError::StaleReply => AppError::Internal(e.to_string()),
        })?;

    let response = match outcome {
        SubmitOutcome::Ignored => ChatResponse {
            accepted: false,
            completed: false,
            turn_index: None,
            turn: None,
            state: session.snapshot().await.state,
        },
        SubmitOutcome::Finished {
            turn_index,
            turn,
            state,
        } => ChatResponse {
            accepted: true,
            completed: true,
            turn_index: Some(turn_index),
            turn: Some(turn),
            state,
        },
        SubmitOutcome::Discarded => ChatResponse {
            accepted: true,
            completed: false,
            turn_index: None,
            turn: None,
            state: session.snapshot().await.state,
        },
    };
    Ok(Json(response))
}

async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(session) = lookup(&state, &id).await? {
        session.clear().await;
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Static Info
// ============================================================

async fn list_examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: EXAMPLES.to_vec(),
    })
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let params = &state.sessions.settings().params;
    Json(ModelsResponse {
        model: state.sessions.model_id().to_string(),
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        top_p: params.top_p,
        streaming: state.sessions.settings().streaming,
        history_scope: state.sessions.scope(),
    })
}

async fn get_version() -> &'static str {
    concat!("code-debug-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
