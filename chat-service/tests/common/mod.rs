//! Shared helpers for chat-service integration tests.

#![allow(dead_code)]

use chat_service::config::{ChatConfig, ObservabilityConfig, SessionConfig, TranscriptConfig};
use chat_service::services::providers::{CompletionProvider, OpenAiConfig};
use chat_service::startup::Application;
use secrecy::Secret;
use service_core::config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn test_config(transcript_path: Option<PathBuf>) -> ChatConfig {
    ChatConfig {
        common: Config { port: 0 },
        openai: OpenAiConfig {
            api_key: Secret::new("sk-test".to_string()),
            base_url: "http://127.0.0.1:9/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 5,
        },
        transcript: TranscriptConfig {
            path: transcript_path,
        },
        session: SessionConfig {
            secure_cookie: false,
            inactivity_hours: 1,
        },
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            otlp_endpoint: None,
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Cookie-aware client: every request shares one session.
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::spawn_with_config(test_config(None), provider).await
    }

    pub async fn spawn_with_config(
        config: ChatConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = Self::new_client();

        // Wait for the server to accept connections
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            address,
            port,
            client,
        }
    }

    /// A client with its own cookie jar, i.e. a different session.
    pub fn new_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client")
    }

    pub async fn post_chat(&self, body: serde_json::Value) -> reqwest::Response {
        self.post_chat_with(&self.client, body).await
    }

    pub async fn post_chat_with(
        &self,
        client: &reqwest::Client,
        body: serde_json::Value,
    ) -> reqwest::Response {
        client
            .post(format!("{}/chat", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to send chat request")
    }

    pub async fn clear(&self) -> reqwest::Response {
        self.client
            .post(format!("{}/clear", self.address))
            .send()
            .await
            .expect("Failed to send clear request")
    }

    pub async fn history_with(&self, client: &reqwest::Client) -> serde_json::Value {
        client
            .get(format!("{}/history", self.address))
            .send()
            .await
            .expect("Failed to send history request")
            .json()
            .await
            .expect("Failed to parse history")
    }

    pub async fn history(&self) -> serde_json::Value {
        self.history_with(&self.client).await
    }
}
