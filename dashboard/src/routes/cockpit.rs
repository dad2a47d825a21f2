use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use axum::{extract::State, routing::get, Router};

use crate::error::ApiError;
use crate::AppState;

/// GET /cockpit - Redirect to the gateway's control UI
async fn cockpit(State(state): State<Arc<AppState>>) -> Response {
    match state.config.cockpit.gateway_ui_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Redirect::temporary(url.trim()).into_response(),
        _ => ApiError::Internal("Missing GATEWAY_UI_URL".to_string()).into_response(),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cockpit", get(cockpit))
        .with_state(state)
}
