use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::get, Json, Router};
use relay_common::{HealthSnapshot, SessionEntry};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CostsResponse {
    pub costs: Costs,
}

/// Token usage of the main session. Only `totalTokens: 0` when there is none.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Costs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<u64>,
}

impl Costs {
    fn empty() -> Self {
        Self {
            total_tokens: Some(0),
            input_tokens: None,
            output_tokens: None,
            percent_used: None,
            model: None,
            context_tokens: None,
        }
    }

    fn of(session: &SessionEntry) -> Self {
        Self {
            total_tokens: session.total_tokens,
            input_tokens: Some(session.input_tokens.unwrap_or(0)),
            output_tokens: Some(session.output_tokens.unwrap_or(0)),
            percent_used: session.percent_used,
            model: session.model.clone(),
            context_tokens: session.context_tokens,
        }
    }
}

/// Usage of the session named `session_key`.
pub fn costs_of(snapshot: &HealthSnapshot, session_key: &str) -> Costs {
    snapshot
        .session(session_key)
        .map(Costs::of)
        .unwrap_or_else(Costs::empty)
}

/// GET /api/costs - Token usage of the main session
async fn costs(State(state): State<Arc<AppState>>) -> Response {
    match state.gateway.health().await {
        Ok(snapshot) => Json(CostsResponse {
            costs: costs_of(&snapshot, &state.config.gateway.session_key),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Cost lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "costs": { "error": e.to_string() } })),
            )
                .into_response()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/costs", get(costs))
        .with_state(state)
}
