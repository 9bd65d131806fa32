//! Pure state transition function

use super::{Effect, Event, TurnContext, TurnState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still being generated; wait for it to finish or clear the history")]
    Busy,
    #[error("Reply does not belong to the turn in flight")]
    StaleReply,
}

/// Pure transition function
///
/// Given the same inputs this always produces the same outputs and performs
/// no I/O. Effects are returned in the order they must be executed.
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User submissions
        // ============================================================

        // Blank input never starts a turn
        (_, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Ok(TransitionResult::new(state.clone()))
        }

        (TurnState::AwaitingReply { .. }, Event::UserSubmit { .. }) => Err(TransitionError::Busy),

        // Idle, Complete and Failed all accept a new turn
        (_, Event::UserSubmit { text }) => {
            let ticket = context.next_ticket();
            Ok(TransitionResult::new(TurnState::AwaitingReply { ticket, chunks: 0 })
                .with_effects([
                    Effect::AppendUserTurn { text },
                    Effect::render_turn(ticket.turn_index),
                    Effect::RequestReply { ticket },
                ]))
        }

        // ============================================================
        // Reset
        // ============================================================
        (_, Event::Clear) => Ok(TransitionResult::new(TurnState::Idle)
            .with_effect(Effect::ClearHistory)
            .with_effect(Effect::render_cleared())),

        // ============================================================
        // Inference results for the turn in flight
        // ============================================================
        (TurnState::AwaitingReply { ticket, chunks }, event)
            if event.ticket() == Some(*ticket) =>
        {
            let turn_index = ticket.turn_index;
            match event {
                Event::ReplyChunk { text, .. } if text.is_empty() => {
                    Ok(TransitionResult::new(state.clone()))
                }
                Event::ReplyChunk { text, .. } => Ok(TransitionResult::new(
                    TurnState::AwaitingReply {
                        ticket: *ticket,
                        chunks: chunks + 1,
                    },
                )
                .with_effect(Effect::AppendChunk { turn_index, text })
                .with_effect(Effect::render_turn(turn_index))),

                Event::ReplyComplete { text, .. } => Ok(TransitionResult::new(TurnState::Complete)
                    .with_effect(Effect::SetReply { turn_index, text })
                    .with_effect(Effect::render_turn(turn_index))),

                Event::StreamEnd { .. } => Ok(TransitionResult::new(TurnState::Complete)
                    .with_effect(Effect::FinalizeReply { turn_index })
                    .with_effect(Effect::render_turn(turn_index))),

                Event::ReplyFailed { message, kind, .. } => {
                    Ok(TransitionResult::new(TurnState::Failed { kind })
                        .with_effect(Effect::RecordFailure {
                            turn_index,
                            message,
                        })
                        .with_effect(Effect::render_turn(turn_index)))
                }

                // UserSubmit and Clear carry no ticket and are matched above
                Event::UserSubmit { .. } | Event::Clear => Err(TransitionError::StaleReply),
            }
        }

        // Reply for a turn that was cleared, or arriving when nothing is in flight
        (_, _) => Err(TransitionError::StaleReply),
    }
}
