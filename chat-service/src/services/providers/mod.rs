//! Completion provider abstraction.
//!
//! The conversation service talks to the language model through
//! [`CompletionProvider`], so the OpenAI-backed client can be swapped for the
//! mock in tests.

pub mod mock;
pub mod openai;

use crate::models::Message;
use async_trait::async_trait;
use thiserror::Error;

pub use mock::MockCompletionProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};

/// Upper bound on reply length, in tokens.
pub const MAX_REPLY_TOKENS: u32 = 500;

/// Sampling temperature. Favours varied, warm phrasing.
pub const TEMPERATURE: f32 = 0.8;

/// Error type for completion calls.
///
/// The `Display` output is what users see inside a degraded reply, so
/// variants render the underlying description without extra wrapping where
/// possible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Error code: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::NotConfigured(_) => "not_configured",
            CompletionError::Network(_) => "network",
            CompletionError::Timeout(_) => "timeout",
            CompletionError::Unauthorized(_) => "unauthorized",
            CompletionError::RateLimited(_) => "rate_limited",
            CompletionError::Api { .. } => "api",
            CompletionError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// A client for a chat-completion service.
///
/// Implementations send the whole ordered message list in a single attempt
/// and return the text of the first choice. Model, reply length and
/// temperature are fixed per provider instance.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Request one completion for `messages`.
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;

    /// Verify the provider is reachable and credentials are accepted.
    async fn health_check(&self) -> Result<(), CompletionError>;
}
