//! Chat sessions
//!
//! A [`ChatSession`] owns one conversation history and drives turns through
//! the state machine. The [`SessionRegistry`] decides which clients share a
//! session.

mod chat;
mod registry;

pub use chat::{ChatSession, SessionSettings, SubmitOutcome};
pub use registry::{SessionRegistry, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE};

use crate::history::Turn;
use crate::state_machine::TurnState;
use serde::Serialize;

/// Notifications sent to connected clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A turn was added or its reply changed
    Turn {
        index: usize,
        turn: Turn,
        state: TurnState,
    },
    /// History was emptied
    Cleared,
}

/// Point-in-time view of a session, used for page loads and SSE init
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub turns: Vec<Turn>,
    pub state: TurnState,
    /// A reply is in flight
    pub busy: bool,
    pub epoch: u64,
}

impl SessionSnapshot {
    /// View of a session that has not been created yet
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            state: TurnState::Idle,
            busy: false,
            epoch: 0,
        }
    }
}
