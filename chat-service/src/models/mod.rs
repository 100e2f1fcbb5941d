//! Domain models for the chat service.

pub mod conversation;
pub mod history;
pub mod message;

pub use conversation::{ConversationRecord, SYSTEM_PROMPT};
pub use history::{HistoryEntry, Sender};
pub use message::{Message, Role};
