//! Session-scoped conversation storage.
//!
//! A [`SessionStore`] is a handle on one client's session: the request
//! handler obtains it from the cookie layer and passes it to the
//! conversation service, which reads and writes the record explicitly.

use crate::models::{ConversationRecord, HistoryEntry, Message};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_sessions::Session;

pub const MESSAGES_KEY: &str = "messages";
pub const HISTORY_KEY: &str = "history";

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session backend error: {0}")]
    Backend(String),
}

impl From<tower_sessions::session::Error> for SessionStoreError {
    fn from(err: tower_sessions::session::Error) -> Self {
        SessionStoreError::Backend(err.to_string())
    }
}

/// Storage for a single session's [`ConversationRecord`].
///
/// No locking is performed: two concurrent requests on the same session each
/// load, mutate and save their own copy, and the later save wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record, or an empty one if the session has none yet.
    async fn load_record(&self) -> Result<ConversationRecord, SessionStoreError>;

    /// Persist the record. An empty message list is stored as absent.
    async fn save_record(&self, record: &ConversationRecord) -> Result<(), SessionStoreError>;

    /// Remove the message list, leaving history in place.
    async fn clear_messages(&self) -> Result<(), SessionStoreError> {
        let mut record = self.load_record().await?;
        record.clear_messages();
        self.save_record(&record).await
    }
}

#[async_trait]
impl SessionStore for Session {
    async fn load_record(&self) -> Result<ConversationRecord, SessionStoreError> {
        let messages = self
            .get::<Vec<Message>>(MESSAGES_KEY)
            .await?
            .unwrap_or_default();
        let history = self
            .get::<Vec<HistoryEntry>>(HISTORY_KEY)
            .await?
            .unwrap_or_default();

        Ok(ConversationRecord { messages, history })
    }

    async fn save_record(&self, record: &ConversationRecord) -> Result<(), SessionStoreError> {
        if record.messages.is_empty() {
            self.remove_value(MESSAGES_KEY).await?;
        } else {
            self.insert(MESSAGES_KEY, &record.messages).await?;
        }
        self.insert(HISTORY_KEY, &record.history).await?;
        Ok(())
    }

    async fn clear_messages(&self) -> Result<(), SessionStoreError> {
        self.remove_value(MESSAGES_KEY).await?;
        Ok(())
    }
}

/// Process-local session handle.
///
/// Clones share the same record, which makes it convenient for tests and for
/// embedding the conversation service outside of HTTP.
#[derive(Debug, Clone, Default)]
pub struct InMemorySession {
    record: Arc<Mutex<ConversationRecord>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored record.
    pub fn snapshot(&self) -> ConversationRecord {
        self.record
            .lock()
            .map(|record| record.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for InMemorySession {
    async fn load_record(&self) -> Result<ConversationRecord, SessionStoreError> {
        self.record
            .lock()
            .map(|record| record.clone())
            .map_err(|e| SessionStoreError::Backend(e.to_string()))
    }

    async fn save_record(&self, record: &ConversationRecord) -> Result<(), SessionStoreError> {
        let mut stored = self
            .record
            .lock()
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        *stored = record.clone();
        Ok(())
    }
}
