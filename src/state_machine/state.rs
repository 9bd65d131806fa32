//! Turn state types

use crate::llm::InferenceErrorKind;
use serde::Serialize;

/// Identifies the turn a reply belongs to.
///
/// The epoch changes whenever the history is cleared, so a reply that was
/// requested before a clear never matches a ticket issued after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket {
    pub epoch: u64,
    pub turn_index: usize,
}

/// Where the session is in its current turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Nothing submitted yet, or history just cleared
    #[default]
    Idle,

    /// Inference request in flight for `ticket`
    AwaitingReply {
        ticket: Ticket,
        /// Non-empty chunks received so far (0 for non-streaming)
        chunks: usize,
    },

    /// Last turn received its full reply
    Complete,

    /// Last turn ended with an error written into its reply slot
    Failed { kind: InferenceErrorKind },
}

impl TurnState {
    /// Check if a reply is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::AwaitingReply { .. })
    }

    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            TurnState::AwaitingReply { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingReply { .. } => "awaiting_reply",
            TurnState::Complete => "complete",
            TurnState::Failed { .. } => "failed",
        }
    }
}

/// Facts about the history the transition function needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnContext {
    /// Current history epoch
    pub epoch: u64,
    /// Number of turns currently stored
    pub turn_count: usize,
}

impl TurnContext {
    pub fn new(epoch: u64, turn_count: usize) -> Self {
        Self { epoch, turn_count }
    }

    /// Ticket the next submitted turn will carry
    pub fn next_ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            turn_index: self.turn_count,
        }
    }
}
