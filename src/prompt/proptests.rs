//! Property-based tests for prompt assembly

use super::*;
use crate::history::Reply;
use crate::llm::Role;
use proptest::prelude::*;

fn arb_finished_turn() -> impl Strategy<Value = Turn> {
    (
        "[a-zA-Z0-9 ]{1,30}",
        "[a-zA-Z0-9 ]{0,30}",
        any::<bool>(),
    )
        .prop_map(|(user_text, text, failed)| Turn {
            user_text,
            reply: if failed {
                Reply::Failed(text)
            } else {
                Reply::Complete(text)
            },
        })
}

fn arb_open_reply() -> impl Strategy<Value = Reply> {
    prop_oneof![
        Just(Reply::Pending),
        "[a-z ]{0,20}".prop_map(Reply::Partial),
    ]
}

/// A history that respects the store invariant, plus the pending text to
/// pass alongside it so that a prompt can always be built.
fn arb_history() -> impl Strategy<Value = (Vec<Turn>, Option<String>)> {
    (
        proptest::collection::vec(arb_finished_turn(), 0..8),
        proptest::option::of(("[a-z ]{1,20}", arb_open_reply())),
        "[a-z ]{1,20}",
    )
        .prop_map(|(mut turns, open, pending)| match open {
            Some((user_text, reply)) => {
                turns.push(Turn { user_text, reply });
                (turns, None)
            }
            None => (turns, Some(pending)),
        })
}

proptest! {
    #[test]
    fn starts_with_one_system_and_ends_with_one_user((history, pending) in arb_history()) {
        let messages = build(&history, pending.as_deref()).unwrap();

        prop_assert_eq!(messages[0].role, Role::System);
        prop_assert_eq!(messages.iter().filter(|m| m.role == Role::System).count(), 1);
        prop_assert_eq!(messages.last().unwrap().role, Role::User);
        if messages.len() > 2 {
            prop_assert_eq!(messages[messages.len() - 2].role, Role::Assistant);
        }
    }

    #[test]
    fn non_system_count_is_two_per_completed_turn_plus_one((history, pending) in arb_history()) {
        let messages = build(&history, pending.as_deref()).unwrap();
        let completed = history.iter().filter(|t| t.is_complete()).count();
        prop_assert_eq!(messages.len() - 1, 2 * completed + 1);
    }

    #[test]
    fn roles_alternate_after_system((history, pending) in arb_history()) {
        let messages = build(&history, pending.as_deref()).unwrap();
        for (i, message) in messages.iter().enumerate().skip(1) {
            let expected = if i % 2 == 1 { Role::User } else { Role::Assistant };
            prop_assert_eq!(message.role, expected);
        }
    }

    #[test]
    fn turn_text_preserved_in_order((history, pending) in arb_history()) {
        let messages = build(&history, pending.as_deref()).unwrap();
        let users: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        let mut expected: Vec<&str> = history.iter().map(|t| t.user_text.as_str()).collect();
        if let Some(pending) = pending.as_deref() {
            expected.push(pending);
        }
        prop_assert_eq!(users, expected);
    }
}
