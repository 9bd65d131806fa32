//! Events that can occur during a turn

use super::state::Ticket;
use crate::llm::InferenceErrorKind;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
    },
    Clear,

    // Inference events
    ReplyChunk {
        ticket: Ticket,
        text: String,
    },
    ReplyComplete {
        ticket: Ticket,
        text: String,
    },
    /// Stream ended normally after zero or more chunks
    StreamEnd {
        ticket: Ticket,
    },
    ReplyFailed {
        ticket: Ticket,
        message: String,
        kind: InferenceErrorKind,
    },
}

impl Event {
    /// Ticket carried by inference events
    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Event::ReplyChunk { ticket, .. }
            | Event::ReplyComplete { ticket, .. }
            | Event::StreamEnd { ticket }
            | Event::ReplyFailed { ticket, .. } => Some(*ticket),
            Event::UserSubmit { .. } | Event::Clear => None,
        }
    }
}
