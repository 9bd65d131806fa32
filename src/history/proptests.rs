//! Property-based tests for the history store

use super::*;
use proptest::prelude::*;

/// Operation applied to a history in sequence
#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    Reply(String),
    Chunks(Vec<String>),
    Fail(String),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-zA-Z0-9 ()]{1,30}".prop_map(Op::Submit),
        2 => "[a-zA-Z0-9 .]{0,30}".prop_map(Op::Reply),
        2 => proptest::collection::vec("[a-z ]{0,8}", 0..5).prop_map(Op::Chunks),
        1 => "[a-z ]{1,20}".prop_map(Op::Fail),
        1 => Just(Op::Clear),
    ]
}

/// Apply an op the way a well-behaved controller would: replies only
/// target the in-flight turn, submissions only happen when none is.
fn apply(history: &mut History, op: Op) {
    let in_flight = history.last().is_some_and(|t| !t.is_complete());
    let last = history.len().checked_sub(1);
    match op {
        Op::Submit(text) if !in_flight => {
            history.append_user(text);
        }
        Op::Reply(text) if in_flight => history.set_assistant(last.unwrap(), text),
        Op::Chunks(chunks) if in_flight => {
            let idx = last.unwrap();
            for chunk in &chunks {
                history.append_assistant_chunk(idx, chunk);
            }
            history.finish(idx);
        }
        Op::Fail(message) if in_flight => history.fail(last.unwrap(), &message),
        Op::Clear => history.clear(),
        _ => {}
    }
}

proptest! {
    #[test]
    fn only_last_turn_may_be_incomplete(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut history = History::new();
        for op in ops {
            apply(&mut history, op);
            let turns = history.turns();
            if turns.len() > 1 {
                for turn in &turns[..turns.len() - 1] {
                    prop_assert!(turn.is_complete());
                }
            }
        }
    }

    #[test]
    fn clear_always_empties(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut history = History::new();
        for op in ops {
            apply(&mut history, op);
        }
        let epoch = history.epoch();
        history.clear();
        prop_assert!(history.is_empty());
        prop_assert_eq!(history.epoch(), epoch + 1);
    }

    #[test]
    fn chunks_concatenate_to_reply(chunks in proptest::collection::vec("[a-zA-Z ]{0,10}", 0..10)) {
        let mut history = History::new();
        let idx = history.append_user("q");
        for chunk in &chunks {
            history.append_assistant_chunk(idx, chunk);
        }
        history.finish(idx);
        let expected = chunks.concat();
        prop_assert_eq!(history.turns()[idx].assistant_text(), Some(expected.as_str()));
    }

    #[test]
    fn snapshot_is_detached(text in "[a-z]{1,10}") {
        let mut history = History::new();
        let idx = history.append_user(text.clone());
        let snapshot = history.snapshot();
        history.set_assistant(idx, "later");
        prop_assert_eq!(&snapshot[0], &Turn::new(text));
    }
}
