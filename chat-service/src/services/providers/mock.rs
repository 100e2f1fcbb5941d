//! Scripted completion provider for tests and local development.

use super::{CompletionError, CompletionProvider};
use crate::models::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Behavior {
    /// Pop replies in order; once exhausted, echo the last user message.
    Scripted(Mutex<VecDeque<String>>),
    Fail(CompletionError),
}

/// Mock completion provider.
///
/// Every call is recorded so tests can assert on the exact payload the
/// conversation service produced.
pub struct MockCompletionProvider {
    behavior: Behavior,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletionProvider {
    /// Echo provider: replies `Echo: <last user message>`.
    pub fn new() -> Self {
        Self::with_replies(Vec::<String>::new())
    }

    /// Reply with each of `replies` in turn, then fall back to echoing.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            behavior: Behavior::Scripted(Mutex::new(
                replies.into_iter().map(Into::into).collect(),
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: CompletionError) -> Self {
        Self {
            behavior: Behavior::Fail(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Message batches received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        match &self.behavior {
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Scripted(replies) => {
                let next = replies.lock().ok().and_then(|mut r| r.pop_front());
                Ok(next.unwrap_or_else(|| {
                    let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
                    format!("Echo: {}", last)
                }))
            }
        }
    }

    async fn health_check(&self) -> Result<(), CompletionError> {
        match &self.behavior {
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Scripted(_) => Ok(()),
        }
    }
}
