//! Turn controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! [`transition`] decides, the session executes the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Ticket, TurnContext, TurnState};
pub use transition::{transition, TransitionError};
