//! Conversation history store
//!
//! An ordered sequence of turns, oldest first. Every turn except possibly
//! the last one carries a finished reply; the store panics on operations
//! that would break that or that name a turn it does not hold.

#[cfg(test)]
mod proptests;

use serde::Serialize;

/// Assistant side of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Reply {
    /// Request in flight, nothing received yet
    Pending,
    /// Streaming; text only ever grows
    Partial(String),
    Complete(String),
    /// Inference failed; holds the user-facing error text
    Failed(String),
}

impl Reply {
    pub fn is_finished(&self) -> bool {
        matches!(self, Reply::Complete(_) | Reply::Failed(_))
    }
}

/// One user message paired with its (possibly pending) reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user_text: String,
    pub reply: Reply,
}

impl Turn {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            reply: Reply::Pending,
        }
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn completed(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            reply: Reply::Complete(assistant_text.into()),
        }
    }

    /// Reply text received so far; `None` while nothing has arrived.
    pub fn assistant_text(&self) -> Option<&str> {
        match &self.reply {
            Reply::Pending => None,
            Reply::Partial(text) | Reply::Complete(text) | Reply::Failed(text) => Some(text),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.reply.is_finished()
    }
}

/// In-memory conversation history
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<Turn>,
    epoch: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn and return its index.
    ///
    /// # Panics
    /// If the previous turn has not finished.
    pub fn append_user(&mut self, text: impl Into<String>) -> usize {
        if let Some(last) = self.turns.last() {
            assert!(
                last.is_complete(),
                "append_user while turn {} is still in flight",
                self.turns.len() - 1
            );
        }
        self.turns.push(Turn::new(text));
        self.turns.len() - 1
    }

    /// Replace the reply of a turn with the full text.
    pub fn set_assistant(&mut self, turn_index: usize, text: impl Into<String>) {
        self.turn_mut(turn_index).reply = Reply::Complete(text.into());
    }

    /// Append a streamed chunk to a turn's reply.
    ///
    /// # Panics
    /// If the turn already finished.
    pub fn append_assistant_chunk(&mut self, turn_index: usize, chunk: &str) {
        let turn = self.turn_mut(turn_index);
        if let Reply::Partial(text) = &mut turn.reply {
            text.push_str(chunk);
            return;
        }
        assert!(
            turn.reply == Reply::Pending,
            "chunk appended to finished turn {turn_index}"
        );
        turn.reply = Reply::Partial(chunk.to_string());
    }

    /// Mark a streamed reply as complete.
    pub fn finish(&mut self, turn_index: usize) {
        let turn = self.turn_mut(turn_index);
        turn.reply = match std::mem::replace(&mut turn.reply, Reply::Pending) {
            Reply::Pending => Reply::Complete(String::new()),
            Reply::Partial(text) | Reply::Complete(text) => Reply::Complete(text),
            failed @ Reply::Failed(_) => failed,
        };
    }

    /// Store an error message as the turn's reply.
    ///
    /// Text streamed before the failure is kept ahead of the message.
    pub fn fail(&mut self, turn_index: usize, message: &str) {
        let turn = self.turn_mut(turn_index);
        let text = match &turn.reply {
            Reply::Partial(partial) if !partial.is_empty() => format!("{partial}\n\n{message}"),
            _ => message.to_string(),
        };
        turn.reply = Reply::Failed(text);
    }

    /// Copy of all turns, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[allow(dead_code)] // Store API used by tests
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[allow(dead_code)] // Store API used by tests
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Incremented by every [`History::clear`].
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.epoch += 1;
    }

    fn turn_mut(&mut self, turn_index: usize) -> &mut Turn {
        let len = self.turns.len();
        self.turns
            .get_mut(turn_index)
            .unwrap_or_else(|| panic!("turn index {turn_index} out of range (len {len})"))
    }
}
