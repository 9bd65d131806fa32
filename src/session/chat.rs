//! One conversation and its turn loop

use super::{SessionEvent, SessionSnapshot};
use crate::history::{History, Turn};
use crate::llm::{ChatRequest, GenerationParams, InferenceClient, InferenceError};
use crate::prompt;
use crate::state_machine::{
    transition, Effect, Event, Ticket, TransitionError, TurnContext, TurnState,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Per-session request settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub params: GenerationParams,
    pub streaming: bool,
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// The turn finished, successfully or with an error written into its reply
    Finished {
        turn_index: usize,
        turn: Turn,
        state: TurnState,
    },
    /// History was cleared while the reply was in flight
    Discarded,
}

struct Inner {
    history: History,
    state: TurnState,
}

pub struct ChatSession {
    id: String,
    inner: Mutex<Inner>,
    client: Arc<dyn InferenceClient>,
    settings: SessionSettings,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub fn new(
        id: impl Into<String>,
        client: Arc<dyn InferenceClient>,
        settings: SessionSettings,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            id: id.into(),
            inner: Mutex::new(Inner {
                history: History::new(),
                state: TurnState::Idle,
            }),
            client,
            settings,
            broadcast_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run one turn to completion.
    ///
    /// Inference failures end up as text in the turn's reply; the only error
    /// returned is [`TransitionError::Busy`] when a turn is already in flight.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, TransitionError> {
        let (ticket, prepared) = {
            let mut inner = self.inner.lock().await;
            let requested = self
                .dispatch(
                    &mut inner,
                    Event::UserSubmit {
                        text: text.to_string(),
                    },
                )
                .inspect_err(|e| tracing::info!(session = %self.id, error = %e, "Submission rejected"))?;
            let Some(ticket) = requested else {
                return Ok(SubmitOutcome::Ignored);
            };
            (ticket, prompt::build(inner.history.turns(), None))
        };

        let messages = match prepared {
            Ok(messages) => messages,
            Err(e) => {
                let error = InferenceError::unclassified(e.to_string());
                return Ok(self.conclude(ticket, self.failure(ticket, &error)).await);
            }
        };

        let request = ChatRequest::new(messages, &self.settings.params, self.settings.streaming);
        let outcome = if self.settings.streaming {
            self.stream_reply(ticket, &request).await
        } else {
            self.complete_reply(ticket, &request).await
        };
        Ok(outcome)
    }

    /// Empty the history. A reply still in flight is dropped when it arrives.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(ticket) = inner.state.ticket() {
            tracing::info!(
                session = %self.id,
                turn = ticket.turn_index,
                "Clearing with a reply in flight"
            );
        }
        if let Err(e) = self.dispatch(&mut inner, Event::Clear) {
            tracing::warn!(session = %self.id, error = %e, "Clear rejected");
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        self.snapshot_locked(&inner)
    }

    /// Snapshot plus a receiver for everything that happens after it
    pub async fn watch(&self) -> (SessionSnapshot, broadcast::Receiver<SessionEvent>) {
        let inner = self.inner.lock().await;
        (self.snapshot_locked(&inner), self.broadcast_tx.subscribe())
    }

    /// Nobody is watching and no reply is in flight
    pub fn is_evictable(&self) -> bool {
        self.broadcast_tx.receiver_count() == 0
            && self
                .inner
                .try_lock()
                .is_ok_and(|inner| !inner.state.is_busy())
    }

    fn snapshot_locked(&self, inner: &Inner) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            turns: inner.history.snapshot(),
            state: inner.state.clone(),
            busy: inner.state.is_busy(),
            epoch: inner.history.epoch(),
        }
    }

    async fn complete_reply(&self, ticket: Ticket, request: &ChatRequest) -> SubmitOutcome {
        let event = match self.client.complete(request).await {
            Ok(text) => Event::ReplyComplete { ticket, text },
            Err(e) => self.failure(ticket, &e),
        };
        self.conclude(ticket, event).await
    }

    async fn stream_reply(&self, ticket: Ticket, request: &ChatRequest) -> SubmitOutcome {
        let mut stream = match self.client.stream(request).await {
            Ok(stream) => stream,
            Err(e) => return self.conclude(ticket, self.failure(ticket, &e)).await,
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    let mut inner = self.inner.lock().await;
                    if let Err(e) = self.dispatch(&mut inner, Event::ReplyChunk { ticket, text }) {
                        tracing::info!(
                            session = %self.id,
                            turn = ticket.turn_index,
                            error = %e,
                            "Abandoning stream"
                        );
                        return SubmitOutcome::Discarded;
                    }
                }
                Err(e) => return self.conclude(ticket, self.failure(ticket, &e)).await,
            }
        }

        self.conclude(ticket, Event::StreamEnd { ticket }).await
    }

    /// Apply the final event of a turn and report the result
    async fn conclude(&self, ticket: Ticket, event: Event) -> SubmitOutcome {
        let mut inner = self.inner.lock().await;
        if let Err(e) = self.dispatch(&mut inner, event) {
            tracing::info!(session = %self.id, turn = ticket.turn_index, error = %e, "Dropping reply");
            return SubmitOutcome::Discarded;
        }

        match inner.history.turns().get(ticket.turn_index) {
            Some(turn) => {
                tracing::info!(
                    session = %self.id,
                    turn = ticket.turn_index,
                    state = inner.state.as_str(),
                    "Turn finished"
                );
                SubmitOutcome::Finished {
                    turn_index: ticket.turn_index,
                    turn: turn.clone(),
                    state: inner.state.clone(),
                }
            }
            None => SubmitOutcome::Discarded,
        }
    }

    fn failure(&self, ticket: Ticket, error: &InferenceError) -> Event {
        tracing::warn!(
            session = %self.id,
            turn = ticket.turn_index,
            kind = error.kind.as_str(),
            error = %error.message,
            "Turn failed"
        );
        Event::ReplyFailed {
            ticket,
            message: error.user_message(&self.settings.params.model),
            kind: error.kind,
        }
    }

    /// Run the transition and execute its effects.
    ///
    /// Returns the ticket of a requested reply; the caller performs the
    /// request after releasing the lock.
    fn dispatch(&self, inner: &mut Inner, event: Event) -> Result<Option<Ticket>, TransitionError> {
        let context = TurnContext::new(inner.history.epoch(), inner.history.len());
        let result = transition(&inner.state, &context, event)?;
        inner.state = result.new_state;

        let mut requested = None;
        for effect in result.effects {
            match effect {
                Effect::AppendUserTurn { text } => {
                    let turn_index = inner.history.append_user(text);
                    tracing::info!(session = %self.id, turn = turn_index, "Turn started");
                }
                Effect::RequestReply { ticket } => requested = Some(ticket),
                Effect::AppendChunk { turn_index, text } => {
                    inner.history.append_assistant_chunk(turn_index, &text);
                }
                Effect::SetReply { turn_index, text } => inner.history.set_assistant(turn_index, text),
                Effect::FinalizeReply { turn_index } => inner.history.finish(turn_index),
                Effect::RecordFailure {
                    turn_index,
                    message,
                } => inner.history.fail(turn_index, &message),
                Effect::ClearHistory => {
                    inner.history.clear();
                    tracing::info!(session = %self.id, epoch = inner.history.epoch(), "History cleared");
                }
                Effect::Render { turn_index } => self.render(inner, turn_index),
            }
        }
        Ok(requested)
    }

    fn render(&self, inner: &Inner, turn_index: Option<usize>) {
        let event = match turn_index {
            Some(index) => match inner.history.turns().get(index) {
                Some(turn) => SessionEvent::Turn {
                    index,
                    turn: turn.clone(),
                    state: inner.state.clone(),
                },
                None => return,
            },
            None => SessionEvent::Cleared,
        };
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
