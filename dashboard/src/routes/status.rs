use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, routing::get, Json, Router};
use relay_common::{HealthSnapshot, SessionEntry};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    pub last_heartbeat: String,
    pub main_session: Option<MainSessionStatus>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MainSessionStatus {
    pub age_ms: Option<i64>,
    pub age_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_tokens: Option<u64>,
}

impl MainSessionStatus {
    fn new(session: &SessionEntry, now_ms: i64) -> Self {
        let age_ms = session.updated_at.map(|updated| now_ms - updated);
        Self {
            age_ms,
            age_min: age_ms.map(minutes),
            model: session.model.clone(),
            total_tokens: session.total_tokens,
            percent_used: session.percent_used,
            remaining_tokens: session.remaining_tokens,
        }
    }
}

/// Milliseconds to whole minutes, halves rounding up.
fn minutes(ms: i64) -> i64 {
    (ms as f64 / 60_000.0 + 0.5).floor() as i64
}

fn heartbeat_label(snapshot: &HealthSnapshot) -> String {
    match snapshot.heartbeat_seconds {
        Some(seconds) if seconds > 0 => format!("{}s interval", seconds),
        _ => "N/A".to_string(),
    }
}

/// Status of the gateway with `session_key` as the main session.
pub fn summarize(snapshot: &HealthSnapshot, session_key: &str, now_ms: i64) -> StatusResponse {
    StatusResponse {
        connected: true,
        last_heartbeat: heartbeat_label(snapshot),
        main_session: snapshot
            .session(session_key)
            .map(|session| MainSessionStatus::new(session, now_ms)),
    }
}

/// GET /api/status - Gateway reachability and main session freshness
async fn status(State(state): State<Arc<AppState>>) -> Response {
    match state.gateway.health().await {
        Ok(snapshot) => {
            let now_ms = chrono::Utc::now().timestamp_millis();
            Json(summarize(&snapshot, &state.config.gateway.session_key, now_ms)).into_response()
        }
        Err(e) => {
            tracing::error!("Status check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "connected": false })),
            )
                .into_response()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}
