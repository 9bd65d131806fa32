//! Prompt assembly
//!
//! Flattens a history snapshot into the message list sent to the model:
//! one system message, a user/assistant pair per finished turn, and exactly
//! one trailing user message.

#[cfg(test)]
mod proptests;

use crate::history::Turn;
use crate::llm::Message;
use thiserror::Error;

/// Fixed instruction sent as the leading system message
pub const SYSTEM_PROMPT: &str = r#"You are an expert Python Code Debugging Assistant.
A user will provide Python code, and optionally an error message or a description of a problem.
Your primary tasks are to:
1.  Carefully analyze the provided Python code.
2.  If an error message is given, focus on explaining that specific error.
3.  If no error message is given, try to identify potential bugs, logical errors, or areas for improvement in the code.
4.  Explain any identified errors or issues in a clear, concise, and step-by-step manner.
5.  Provide the corrected or improved Python code.
6.  Ensure the corrected code is well-formatted. Use Markdown for Python code blocks, like this:
    ```python
    # your corrected code here
    print("Hello, World!")
    ```
7.  If the query is not about Python code or doesn't contain code, respond as a helpful general assistant.
8.  Be friendly and encouraging.
"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("turn {index} has no reply but is not the last turn")]
    IncompleteTurn { index: usize },
    #[error("history ends with an unanswered turn and a different pending message was supplied")]
    AmbiguousTrailingUser,
    #[error("no user message to end the prompt with")]
    MissingUserMessage,
}

/// Build the message list for the next request.
///
/// When the last turn of `history` is still unanswered its text is the
/// trailing user message; otherwise `pending_user_text` is.
pub fn build(history: &[Turn], pending_user_text: Option<&str>) -> Result<Vec<Message>, PromptError> {
    build_with_instruction(SYSTEM_PROMPT, history, pending_user_text)
}

pub fn build_with_instruction(
    instruction: &str,
    history: &[Turn],
    pending_user_text: Option<&str>,
) -> Result<Vec<Message>, PromptError> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(Message::system(instruction));

    let mut trailing: Option<&str> = None;
    for (index, turn) in history.iter().enumerate() {
        match turn.assistant_text() {
            Some(reply) if turn.is_complete() => {
                messages.push(Message::user(&turn.user_text));
                messages.push(Message::assistant(reply));
            }
            _ if index + 1 == history.len() => trailing = Some(&turn.user_text),
            _ => return Err(PromptError::IncompleteTurn { index }),
        }
    }

    let user_text = match (trailing, pending_user_text) {
        (Some(open), Some(pending)) if open != pending => {
            return Err(PromptError::AmbiguousTrailingUser)
        }
        (Some(text), _) | (None, Some(text)) => text,
        (None, None) => return Err(PromptError::MissingUserMessage),
    };
    messages.push(Message::user(user_text));

    Ok(messages)
}
