//! Effects produced by state transitions

use super::state::Ticket;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a new turn in the history
    AppendUserTurn { text: String },

    /// Assemble the prompt and call the inference client
    RequestReply { ticket: Ticket },

    /// Append a streamed chunk to the turn's reply
    AppendChunk { turn_index: usize, text: String },

    /// Store the full reply
    SetReply { turn_index: usize, text: String },

    /// Mark a streamed reply complete
    FinalizeReply { turn_index: usize },

    /// Write the user-facing error text into the turn's reply slot
    RecordFailure { turn_index: usize, message: String },

    ClearHistory,

    /// Notify connected clients; `None` means the history was cleared
    Render { turn_index: Option<usize> },
}

impl Effect {
    pub fn render_turn(turn_index: usize) -> Self {
        Effect::Render {
            turn_index: Some(turn_index),
        }
    }

    pub fn render_cleared() -> Self {
        Effect::Render { turn_index: None }
    }
}
