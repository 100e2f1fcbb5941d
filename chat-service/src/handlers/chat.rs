//! Conversation endpoints: `/chat`, `/clear` and `/history`.

use crate::models::HistoryEntry;
use crate::services::{ConversationError, Reply};
use crate::startup::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub status: &'static str,
}

impl From<ConversationError> for AppError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::MessageRequired => {
                AppError::BadRequest(anyhow::anyhow!("message required"))
            }
            ConversationError::Store(e) => AppError::InternalError(e.into()),
        }
    }
}

/// Submit a message.
///
/// A body that is missing, not JSON, or lacks a string `message` is treated
/// like a blank message. Completion failures still answer 200; the reply text
/// carries the failure description.
#[tracing::instrument(skip(state, session, payload))]
pub async fn chat(
    State(state): State<AppState>,
    session: Session,
    payload: Option<Json<ChatRequest>>,
) -> Result<Json<ChatResponse>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let message = request.message.unwrap_or_default();

    let reply = state.conversations.submit(&session, &message).await?;
    if let Reply::Degraded { error, .. } = &reply {
        tracing::warn!(error_type = error.kind(), "Answering with degraded reply");
    }

    Ok(Json(ChatResponse {
        reply: reply.into_text(),
    }))
}

/// Clear the active conversation, keeping history.
#[tracing::instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ClearResponse>, AppError> {
    state.conversations.clear(&session).await?;
    Ok(Json(ClearResponse { status: "cleared" }))
}

/// Visible history, oldest first.
#[tracing::instrument(skip(state, session))]
pub async fn history(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.conversations.history(&session).await?))
}
