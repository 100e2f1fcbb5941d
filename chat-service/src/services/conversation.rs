//! Conversation orchestration.
//!
//! Ties the session store, the completion provider and the transcript
//! together. Handlers stay thin: they parse input, call one of the three
//! operations here and map the outcome to a response.

use super::metrics;
use super::providers::{CompletionError, CompletionProvider};
use super::session_store::{SessionStore, SessionStoreError};
use super::transcript::TranscriptLog;
use crate::models::HistoryEntry;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Prefix of the reply returned when the completion service fails.
pub const DEGRADED_REPLY_PREFIX: &str = "Oops! Something went wrong: ";

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("message required")]
    MessageRequired,

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Outcome of a submitted message.
///
/// A failed completion is not an error for the caller: it becomes a
/// chat-shaped reply describing the failure. The two cases are kept apart
/// here so code that cares can tell them apart without inspecting the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Completed(String),
    Degraded {
        text: String,
        error: CompletionError,
    },
}

impl Reply {
    fn degraded(error: CompletionError) -> Self {
        Reply::Degraded {
            text: format!("{}{}", DEGRADED_REPLY_PREFIX, error),
            error,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Reply::Completed(text) => text,
            Reply::Degraded { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Completed(text) => text,
            Reply::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Reply::Degraded { .. })
    }
}

pub struct ConversationService {
    provider: Arc<dyn CompletionProvider>,
    transcript: Arc<TranscriptLog>,
}

impl ConversationService {
    pub fn new(provider: Arc<dyn CompletionProvider>, transcript: Arc<TranscriptLog>) -> Self {
        Self {
            provider,
            transcript,
        }
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    /// Submit a user message and return the assistant's reply.
    ///
    /// Blank input is rejected before the session is touched. Otherwise the
    /// user turn and the reply (real or degraded) are both appended to the
    /// session's messages and history.
    #[tracing::instrument(skip(self, store, user_text), fields(provider = %self.provider.name()))]
    pub async fn submit(
        &self,
        store: &dyn SessionStore,
        user_text: &str,
    ) -> Result<Reply, ConversationError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(ConversationError::MessageRequired);
        }

        let mut record = store.load_record().await?;
        record.push_user(text);

        let provider = self.provider.name();
        let started = Instant::now();
        let reply = match self.provider.complete(&record.messages).await {
            Ok(reply) => {
                metrics::record_completion_success(provider, started.elapsed().as_secs_f64());
                Reply::Completed(reply)
            }
            Err(error) => {
                metrics::record_completion_error(
                    provider,
                    error.kind(),
                    started.elapsed().as_secs_f64(),
                );
                tracing::warn!(error = %error, "Completion failed, returning degraded reply");
                Reply::degraded(error)
            }
        };

        record.push_assistant(reply.text());
        store.save_record(&record).await?;

        if let Reply::Completed(reply_text) = &reply {
            self.transcript.record(text, reply_text).await;
        }

        tracing::info!(
            turns = record.history.len() / 2,
            degraded = reply.is_degraded(),
            "Conversation turn completed"
        );

        Ok(reply)
    }

    /// Forget the active conversation. History is kept.
    pub async fn clear(&self, store: &dyn SessionStore) -> Result<(), ConversationError> {
        store.clear_messages().await?;
        Ok(())
    }

    /// Visible history of the session, oldest first.
    pub async fn history(
        &self,
        store: &dyn SessionStore,
    ) -> Result<Vec<HistoryEntry>, ConversationError> {
        Ok(store.load_record().await?.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Role, Sender, SYSTEM_PROMPT};
    use crate::services::providers::MockCompletionProvider;
    use crate::services::session_store::InMemorySession;

    fn service(provider: Arc<MockCompletionProvider>) -> ConversationService {
        ConversationService::new(provider, Arc::new(TranscriptLog::disabled()))
    }

    #[tokio::test]
    async fn first_submit_seeds_system_prompt() {
        let provider = Arc::new(MockCompletionProvider::with_replies(["I'm here for you."]));
        let conversations = service(provider.clone());
        let session = InMemorySession::new();

        let reply = conversations
            .submit(&session, "I feel heartbroken")
            .await
            .unwrap();
        assert_eq!(reply, Reply::Completed("I'm here for you.".to_string()));

        let record = session.snapshot();
        assert_eq!(
            record.messages,
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user("I feel heartbroken"),
                Message::assistant("I'm here for you."),
            ]
        );
        assert_eq!(
            record.history,
            vec![
                HistoryEntry::user("I feel heartbroken"),
                HistoryEntry::bot("I'm here for you."),
            ]
        );

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].role, Role::System);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_mutation() {
        let provider = Arc::new(MockCompletionProvider::new());
        let conversations = service(provider.clone());
        let session = InMemorySession::new();
        conversations.submit(&session, "hello").await.unwrap();
        let before = session.snapshot();

        for input in ["", "   ", "\n\t"] {
            let err = conversations.submit(&session, input).await.unwrap_err();
            assert!(matches!(err, ConversationError::MessageRequired));
            assert_eq!(err.to_string(), "message required");
        }

        assert_eq!(session.snapshot(), before);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn n_turns_yield_2n_history_and_2n_plus_1_messages() {
        let conversations = service(Arc::new(MockCompletionProvider::new()));
        let session = InMemorySession::new();

        for n in 1..=4 {
            conversations
                .submit(&session, &format!("message {}", n))
                .await
                .unwrap();
            let record = session.snapshot();
            assert_eq!(record.history.len(), 2 * n);
            assert_eq!(record.messages.len(), 2 * n + 1);
        }

        let senders: Vec<Sender> = session.snapshot().history.iter().map(|h| h.sender).collect();
        assert_eq!(
            senders,
            vec![
                Sender::User,
                Sender::Bot,
                Sender::User,
                Sender::Bot,
                Sender::User,
                Sender::Bot,
                Sender::User,
                Sender::Bot,
            ]
        );
    }

    #[tokio::test]
    async fn user_text_is_trimmed() {
        let conversations = service(Arc::new(MockCompletionProvider::new()));
        let session = InMemorySession::new();

        let reply = conversations.submit(&session, "  hi  ").await.unwrap();
        assert_eq!(reply.text(), "Echo: hi");
        assert_eq!(session.snapshot().history[0], HistoryEntry::user("hi"));
    }

    #[tokio::test]
    async fn completion_failure_degrades_into_reply() {
        let provider = Arc::new(MockCompletionProvider::failing(CompletionError::Network(
            "timeout".to_string(),
        )));
        let conversations = service(provider);
        let session = InMemorySession::new();

        let reply = conversations.submit(&session, "hello").await.unwrap();
        assert!(reply.is_degraded());
        assert_eq!(reply.text(), "Oops! Something went wrong: timeout");

        let record = session.snapshot();
        assert_eq!(record.messages.len(), 3);
        assert_eq!(
            record.messages[2],
            Message::assistant("Oops! Something went wrong: timeout")
        );
        assert_eq!(
            record.history[1],
            HistoryEntry::bot("Oops! Something went wrong: timeout")
        );
    }

    #[tokio::test]
    async fn clear_resets_messages_and_next_submit_reseeds() {
        let provider = Arc::new(MockCompletionProvider::new());
        let conversations = service(provider.clone());
        let session = InMemorySession::new();

        conversations.submit(&session, "one").await.unwrap();
        conversations.submit(&session, "two").await.unwrap();
        let history_before = session.snapshot().history;

        conversations.clear(&session).await.unwrap();
        conversations.clear(&session).await.unwrap();
        assert!(session.snapshot().messages.is_empty());
        assert_eq!(conversations.history(&session).await.unwrap(), history_before);

        conversations.submit(&session, "three").await.unwrap();
        let last_call = provider.calls().pop().unwrap();
        assert_eq!(
            last_call,
            vec![Message::system(SYSTEM_PROMPT), Message::user("three")]
        );
        assert_eq!(session.snapshot().history.len(), 6);
    }

    #[tokio::test]
    async fn history_of_fresh_session_is_empty() {
        let conversations = service(Arc::new(MockCompletionProvider::new()));
        let history = conversations
            .history(&InMemorySession::new())
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn successful_turns_are_written_to_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_log.txt");
        let conversations = ConversationService::new(
            Arc::new(MockCompletionProvider::with_replies(["take care"])),
            Arc::new(TranscriptLog::new(&path)),
        );

        conversations
            .submit(&InMemorySession::new(), "goodnight")
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("] USER: goodnight\n"));
        assert!(contents.contains("] BOT: take care\n\n"));
    }

    #[tokio::test]
    async fn degraded_turns_are_not_written_to_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_log.txt");
        let conversations = ConversationService::new(
            Arc::new(MockCompletionProvider::failing(CompletionError::RateLimited(
                "slow down".to_string(),
            ))),
            Arc::new(TranscriptLog::new(&path)),
        );

        conversations
            .submit(&InMemorySession::new(), "hello")
            .await
            .unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn transcript_failure_does_not_fail_submit() {
        let dir = tempfile::tempdir().unwrap();
        let conversations = ConversationService::new(
            Arc::new(MockCompletionProvider::new()),
            Arc::new(TranscriptLog::new(dir.path().join("nope").join("log.txt"))),
        );

        let reply = conversations
            .submit(&InMemorySession::new(), "hello")
            .await
            .unwrap();
        assert_eq!(reply, Reply::Completed("Echo: hello".to_string()));
    }
}
