//! Per-session conversation state.

use super::{HistoryEntry, Message};
use serde::{Deserialize, Serialize};

/// Instruction seeded as the first message of every conversation.
pub const SYSTEM_PROMPT: &str = "You are a warm, empathetic, supportive, and non-judgmental chatbot that ONLY talks about \
love, relationships, emotions, romance, trust, heartbreak, and human connection. \
You can understand any language the user writes in and always respond in the same language. \
If a user asks anything unrelated (math, programming, politics, sports, etc.), politely refuse \
and remind them that you only answer love and relationship topics. \
If the user expresses self-harm or danger, advise them to seek professional help immediately, \
and provide general safety guidance.";

/// The state a session carries between requests.
///
/// Invariants:
/// - when `messages` is non-empty its first element is the system prompt;
/// - `history` only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Payload sent to the completion service. Reset by `clear`.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Visible transcript of the session. Never reset.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ConversationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn, seeding the system prompt first if the
    /// conversation is empty.
    pub fn push_user(&mut self, text: &str) {
        if self.messages.is_empty() {
            self.messages.push(Message::system(SYSTEM_PROMPT));
        }
        self.messages.push(Message::user(text));
        self.history.push(HistoryEntry::user(text));
    }

    /// Append the assistant turn answering the latest user message.
    pub fn push_assistant(&mut self, text: &str) {
        self.messages.push(Message::assistant(text));
        self.history.push(HistoryEntry::bot(text));
    }

    /// Drop the completion payload, keeping history.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }
}
