//! Web search proxy backed by the Tavily API.

use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const MAX_RESULTS_LIMIT: u32 = 10;

/// Client for the Tavily search API.
pub struct SearchClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Tavily request body.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

/// Search results as returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub answer: Option<String>,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Missing TAVILY_API_KEY")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Tavily error ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Clamp a requested result count into `1..=10`, defaulting to 5.
pub fn clamp_max_results(requested: Option<f64>) -> u32 {
    match requested {
        Some(n) if n.is_finite() => n.floor().clamp(1.0, MAX_RESULTS_LIMIT as f64) as u32,
        _ => DEFAULT_MAX_RESULTS,
    }
}

impl SearchClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Result<SearchResponse, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingApiKey)?;

        let url = format!("{}/search", self.base_url);
        tracing::debug!("Sending search request to {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(&TavilyRequest {
                api_key,
                query,
                max_results,
                include_answer: true,
                include_raw_content: false,
                include_images: false,
            })
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(SearchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(SearchResponse {
            query: query.to_string(),
            answer: data.answer,
            results: data
                .results
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title.unwrap_or_default(),
                    url: r.url.unwrap_or_default(),
                    content: r.content.unwrap_or_default(),
                    score: r.score,
                })
                .collect(),
        })
    }
}
