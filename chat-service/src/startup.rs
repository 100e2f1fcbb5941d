//! Application startup and lifecycle management.

use crate::config::ChatConfig;
use crate::handlers::{
    app::{health_check, index, metrics_endpoint, not_found, readiness_check},
    chat::{chat, clear, history},
};
use crate::services::providers::{CompletionProvider, OpenAiProvider};
use crate::services::session_backend::SESSION_SWEEP_INTERVAL;
use crate::services::{ConversationService, ExpiringMemoryStore, TranscriptLog};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::observability::REQUEST_ID_HEADER;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};

pub const SESSION_COOKIE_NAME: &str = "chat_session";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub conversations: Arc<ConversationService>,
    pub sessions: ExpiringMemoryStore,
}

impl AppState {
    pub fn new(config: ChatConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let transcript = match &config.transcript.path {
            Some(path) => TranscriptLog::new(path),
            None => TranscriptLog::disabled(),
        };

        Self {
            conversations: Arc::new(ConversationService::new(provider, Arc::new(transcript))),
            sessions: ExpiringMemoryStore::new(),
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(state.sessions.clone())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(state.config.session.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::hours(i64::from(
            state.config.session.inactivity_hours,
        ))));

    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat))
        .route("/clear", post(clear))
        .route("/history", get(history))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    session_sweeper: JoinHandle<()>,
}

impl Application {
    /// Build the application with the OpenAI completion provider.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let provider = OpenAiProvider::new(config.openai.clone()).map_err(|e| {
            tracing::error!("Failed to initialize completion provider: {}", e);
            AppError::ConfigError(e.into())
        })?;

        tracing::info!(
            model = %provider.model(),
            base_url = %config.openai.base_url,
            "Initialized OpenAI completion provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: ChatConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, AppError> {
        match &config.transcript.path {
            Some(path) => tracing::info!(path = %path.display(), "Transcript enabled"),
            None => tracing::info!("Transcript disabled"),
        }

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        let state = AppState::new(config, provider);
        let session_sweeper = state.sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);
        let router = build_router(state);

        Ok(Self {
            port,
            listener,
            router,
            session_sweeper,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            });

        self.session_sweeper.abort();
        result
    }
}
