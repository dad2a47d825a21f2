use std::sync::Arc;

use axum::body::Bytes;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::error::ApiError;
use crate::search::{clamp_max_results, SearchError, SearchResponse};
use crate::AppState;

/// Query and result count from a loosely shaped body. Anything that is not
/// a JSON object counts as empty.
fn search_params(body: &[u8]) -> (String, u32) {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let query = value
        .get("query")
        .and_then(Value::as_str)
        .map(|q| q.trim().to_string())
        .unwrap_or_default();
    let max_results = clamp_max_results(value.get("maxResults").and_then(Value::as_f64));
    (query, max_results)
}

/// POST /api/web-search - Proxy a web search to Tavily
async fn web_search(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    if !state.search.is_configured() {
        return Err(ApiError::Internal(SearchError::MissingApiKey.to_string()));
    }

    let (query, max_results) = search_params(&body);
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing query".to_string()));
    }

    let response = state
        .search
        .search(&query, max_results)
        .await
        .map_err(|e| {
            tracing::error!("Web search failed: {}", e);
            match e {
                SearchError::Upstream { .. } => ApiError::Upstream(e.to_string()),
                other => ApiError::Internal(other.to_string()),
            }
        })?;

    Ok(Json(response))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/web-search", post(web_search))
        .with_state(state)
}
