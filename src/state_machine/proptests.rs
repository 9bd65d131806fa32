//! Property-based tests for the state machine
//!
//! A small model of the history (epoch + turn count) is driven alongside the
//! state so tickets look like the ones a session would really produce.

use super::*;
use crate::llm::InferenceErrorKind;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = InferenceErrorKind> {
    prop_oneof![
        Just(InferenceErrorKind::MissingCredential),
        Just(InferenceErrorKind::AuthenticationFailure),
        Just(InferenceErrorKind::ModelUnavailable),
        Just(InferenceErrorKind::TransportError),
        Just(InferenceErrorKind::UnclassifiedFailure),
    ]
}

/// Event shape; the ticket is filled in when the step is applied
#[derive(Debug, Clone)]
enum Step {
    Submit(String),
    Chunk(String),
    Complete(String),
    End,
    Fail(String, InferenceErrorKind),
    Clear,
    /// Replay a reply for a ticket from an earlier epoch
    Stale(String),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => "[a-zA-Z ]{0,20}".prop_map(Step::Submit),
        3 => "[a-z ]{0,8}".prop_map(Step::Chunk),
        1 => "[a-z ]{0,20}".prop_map(Step::Complete),
        1 => Just(Step::End),
        1 => ("[a-z ]{1,20}", arb_error_kind()).prop_map(|(m, k)| Step::Fail(m, k)),
        1 => Just(Step::Clear),
        1 => "[a-z]{1,10}".prop_map(Step::Stale),
    ]
}

#[derive(Debug, Default)]
struct Model {
    state: TurnState,
    epoch: u64,
    turn_count: usize,
}

impl Model {
    fn context(&self) -> TurnContext {
        TurnContext::new(self.epoch, self.turn_count)
    }

    /// Ticket for inference events: the one in flight, or a fresh-looking one
    fn ticket(&self) -> Ticket {
        self.state
            .ticket()
            .unwrap_or_else(|| self.context().next_ticket())
    }

    fn event(&self, step: Step) -> Event {
        let ticket = self.ticket();
        match step {
            Step::Submit(text) => Event::UserSubmit { text },
            Step::Chunk(text) => Event::ReplyChunk { ticket, text },
            Step::Complete(text) => Event::ReplyComplete { ticket, text },
            Step::End => Event::StreamEnd { ticket },
            Step::Fail(message, kind) => Event::ReplyFailed {
                ticket,
                message,
                kind,
            },
            Step::Clear => Event::Clear,
            Step::Stale(text) => Event::ReplyComplete {
                ticket: Ticket {
                    epoch: self.epoch.wrapping_sub(1),
                    turn_index: ticket.turn_index,
                },
                text,
            },
        }
    }

    fn apply_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::AppendUserTurn { .. } => self.turn_count += 1,
                Effect::ClearHistory => {
                    self.turn_count = 0;
                    self.epoch += 1;
                }
                _ => {}
            }
        }
    }
}

fn turn_index_of(effect: &Effect) -> Option<usize> {
    match effect {
        Effect::AppendChunk { turn_index, .. }
        | Effect::SetReply { turn_index, .. }
        | Effect::FinalizeReply { turn_index }
        | Effect::RecordFailure { turn_index, .. } => Some(*turn_index),
        Effect::RequestReply { ticket } => Some(ticket.turn_index),
        _ => None,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Assistant writes always target the last stored turn
    #[test]
    fn prop_writes_target_last_turn(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let mut model = Model::default();
        for step in steps {
            let event = model.event(step);
            if let Ok(result) = transition(&model.state, &model.context(), event) {
                model.apply_effects(&result.effects);
                for effect in &result.effects {
                    if let Some(index) = turn_index_of(effect) {
                        prop_assert_eq!(index + 1, model.turn_count, "effect {:?}", effect);
                    }
                }
                model.state = result.new_state;
            }
        }
    }

    // A turn starts with exactly: append, render, request
    #[test]
    fn prop_user_append_precedes_request(text in "[a-zA-Z]{1,20}", count in 0usize..5) {
        let ctx = TurnContext::new(0, count);
        let result = transition(&TurnState::Complete, &ctx, Event::UserSubmit { text: text.clone() }).unwrap();
        prop_assert_eq!(result.effects.len(), 3);
        prop_assert_eq!(&result.effects[0], &Effect::AppendUserTurn { text });
        let is_request = matches!(result.effects[2], Effect::RequestReply { .. });
        prop_assert!(is_request);
    }

    // Non-blank submissions are rejected while a reply is in flight
    #[test]
    fn prop_busy_rejects_submissions(text in "[a-zA-Z]{1,20}", chunks in 0usize..10) {
        let ctx = TurnContext::new(0, 1);
        let state = TurnState::AwaitingReply { ticket: Ticket { epoch: 0, turn_index: 0 }, chunks };
        let result = transition(&state, &ctx, Event::UserSubmit { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Blank submissions never change anything
    #[test]
    fn prop_blank_submit_is_noop(
        steps in proptest::collection::vec(arb_step(), 0..20),
        blank in "[ \t\n]{0,5}"
    ) {
        let mut model = Model::default();
        for step in steps {
            let event = model.event(step);
            if let Ok(result) = transition(&model.state, &model.context(), event) {
                model.apply_effects(&result.effects);
                model.state = result.new_state;
            }
        }
        let result = transition(&model.state, &model.context(), Event::UserSubmit { text: blank }).unwrap();
        prop_assert_eq!(result.new_state, model.state);
        prop_assert!(result.effects.is_empty());
    }

    // Clear always succeeds and lands in Idle
    #[test]
    fn prop_clear_always_idle(steps in proptest::collection::vec(arb_step(), 0..20)) {
        let mut model = Model::default();
        for step in steps {
            let event = model.event(step);
            if let Ok(result) = transition(&model.state, &model.context(), event) {
                model.apply_effects(&result.effects);
                model.state = result.new_state;
            }
            let cleared = transition(&model.state, &model.context(), Event::Clear).unwrap();
            prop_assert_eq!(cleared.new_state, TurnState::Idle);
            prop_assert_eq!(cleared.effects[0].clone(), Effect::ClearHistory);
        }
    }

    // Replies from an earlier epoch are always rejected
    #[test]
    fn prop_stale_epoch_rejected(steps in proptest::collection::vec(arb_step(), 0..20), text in "[a-z]{1,10}") {
        let mut model = Model::default();
        for step in steps {
            let event = model.event(step);
            if let Ok(result) = transition(&model.state, &model.context(), event) {
                model.apply_effects(&result.effects);
                model.state = result.new_state;
            }
        }
        let event = model.event(Step::Stale(text));
        let result = transition(&model.state, &model.context(), event);
        prop_assert_eq!(result.unwrap_err(), TransitionError::StaleReply);
    }

    // Only AwaitingReply consumes inference events
    #[test]
    fn prop_reply_without_request_is_stale(
        state in prop_oneof![
            Just(TurnState::Idle),
            Just(TurnState::Complete),
            arb_error_kind().prop_map(|kind| TurnState::Failed { kind }),
        ],
        text in "[a-z]{1,10}"
    ) {
        let ctx = TurnContext::new(0, 1);
        let ticket = Ticket { epoch: 0, turn_index: 0 };
        for event in [
            Event::ReplyChunk { ticket, text: text.clone() },
            Event::ReplyComplete { ticket, text: text.clone() },
            Event::StreamEnd { ticket },
        ] {
            prop_assert_eq!(transition(&state, &ctx, event).unwrap_err(), TransitionError::StaleReply);
        }
    }

    // Chunk counting matches the number of non-empty chunks
    #[test]
    fn prop_chunk_count(chunks in proptest::collection::vec("[a-z]{0,4}", 0..20)) {
        let ctx = TurnContext::new(0, 1);
        let ticket = Ticket { epoch: 0, turn_index: 0 };
        let mut state = TurnState::AwaitingReply { ticket, chunks: 0 };
        for text in &chunks {
            state = transition(&state, &ctx, Event::ReplyChunk { ticket, text: text.clone() })
                .unwrap()
                .new_state;
        }
        let expected = chunks.iter().filter(|c| !c.is_empty()).count();
        prop_assert_eq!(state, TurnState::AwaitingReply { ticket, chunks: expected });
    }
}
