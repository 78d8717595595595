use super::message::Message;
use super::role::Role;

/// The ordered chat history shown to the user for one session.
///
/// Created with a single seed assistant greeting, then grows by exactly one
/// user/assistant pair per completed turn. The intermediate tool traffic of
/// a turn is rendered as it happens but never stored here, so after N turns
/// the transcript holds 1 + 2N messages with strictly alternating roles.
/// Owned by the session that created it and dropped with it; nothing is
/// persisted.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create a transcript seeded with an assistant greeting
    pub fn new<S: Into<String>>(greeting: S) -> Self {
        Transcript {
            messages: vec![Message::assistant().with_text(greeting)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the user's question for a new turn
    pub fn push_user<S: Into<String>>(&mut self, question: S) {
        self.messages.push(Message::user().with_text(question));
    }

    /// Append the final answer that closes the current turn
    pub fn push_assistant<S: Into<String>>(&mut self, answer: S) {
        self.messages.push(Message::assistant().with_text(answer));
    }

    /// Discard an aborted turn: drop messages back through the most recent
    /// user message so the transcript returns to its last well-formed state.
    pub fn rollback_turn(&mut self) {
        while let Some(message) = self.messages.pop() {
            if message.role == Role::User {
                break;
            }
        }
    }
}
