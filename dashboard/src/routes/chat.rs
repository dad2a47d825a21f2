use std::sync::Arc;

use axum::body::Bytes;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Pull a non-empty `text` string out of the request body.
fn chat_text(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("text") {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// POST /api/chat-send - Relay one message to the main agent session
async fn chat_send(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let text = chat_text(&body).ok_or_else(|| ApiError::BadRequest("Invalid text".to_string()))?;

    let reply = state.gateway.send_chat(&text).await.map_err(|e| {
        tracing::error!("Chat relay failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(ChatReply { reply }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat-send", post(chat_send))
        .with_state(state)
}
