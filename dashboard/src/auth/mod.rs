//! User authentication and the e-mail allow-list.

pub mod jwks;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub use jwks::JwksClient;

use crate::error::ApiError;
use crate::AppState;

/// Authenticated user information extracted from the ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub sub: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

/// Identity provider seam. Production uses [`JwksClient`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError>;
}

/// E-mail addresses allowed to use the dashboard.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    /// Parse a comma-separated list. Entries are trimmed and lower-cased,
    /// empty entries dropped.
    pub fn parse(raw: &str) -> Self {
        let emails = raw
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn from_config(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// An empty list lets everyone in.
    pub fn is_open(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn permits(&self, email: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }
        match email {
            Some(email) => self.emails.contains(&email.trim().to_lowercase()),
            None => false,
        }
    }
}

/// Middleware guarding every protected route.
///
/// Rejects with 401 when the bearer token does not verify and 403 when the
/// user is not on the allow-list. The [`AuthUser`] is handed to handlers as
/// a request extension.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match state.authenticator.authenticate(request.headers()).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!("Authentication failed: {}", e);
            return ApiError::Unauthorized(e.to_string()).into_response();
        }
    };

    if !state.allow_list.permits(user.email.as_deref()) {
        tracing::warn!(
            sub = %user.sub,
            email = ?user.email,
            "User not on the allow-list"
        );
        return ApiError::Forbidden("Not allowed".to_string()).into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}
