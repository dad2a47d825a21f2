//! Helpers shared by unit and integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use gateway_client::{GatewayConfig, GatewayError};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use relay_common::HealthSnapshot;
use serde::Serialize;

use crate::auth::jwks::bearer_token;
use crate::auth::{AllowList, AuthError, AuthUser, Authenticator};
use crate::config::{
    AuthConfig, CockpitConfig, Config, CorsConfig, LoggingConfig, SearchConfig, ServerConfig,
};
use crate::gateway::Gateway;
use crate::search::SearchClient;
use crate::AppState;

/// RSA key pair used to sign test ID tokens.
pub const TEST_RSA_PEM: &str = include_str!("../tests/fixtures/test_rsa.pem");
/// Base64url modulus of [`TEST_RSA_PEM`], for serving it as a JWK.
pub const TEST_RSA_MODULUS: &str = include_str!("../tests/fixtures/test_rsa.n");
pub const TEST_RSA_EXPONENT: &str = "AQAB";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        gateway: GatewayConfig::new("ws://127.0.0.1:1"),
        auth: AuthConfig {
            oidc_issuer: "https://test-issuer".to_string(),
            oidc_audience: Some("test-audience".to_string()),
            allowed_emails: None,
        },
        search: SearchConfig {
            tavily_api_key: None,
            base_url: "http://127.0.0.1:1".to_string(),
        },
        cockpit: CockpitConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
    }
}

/// Accepts `Bearer <email>` and signs that address in. `Bearer anonymous`
/// yields a user without an e-mail, anything else is rejected.
pub struct StubAuthenticator;

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers)?;
        if token == "anonymous" {
            return Ok(AuthUser {
                sub: "anonymous".to_string(),
                email: None,
            });
        }
        if !token.contains('@') {
            return Err(AuthError::InvalidToken("not an e-mail".to_string()));
        }
        Ok(AuthUser {
            sub: format!("sub-{}", token),
            email: Some(token.to_string()),
        })
    }
}

/// Canned gateway that records the chat messages it receives.
pub struct StubGateway {
    pub chat: Result<String, GatewayError>,
    pub health: Result<HealthSnapshot, GatewayError>,
    pub sent: Mutex<Vec<String>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            chat: Ok("stub reply".to_string()),
            health: Ok(HealthSnapshot::default()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chat(mut self, chat: Result<String, GatewayError>) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_health(mut self, health: Result<HealthSnapshot, GatewayError>) -> Self {
        self.health = health;
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn send_chat(&self, text: &str) -> Result<String, GatewayError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        self.chat.clone()
    }

    async fn health(&self) -> Result<HealthSnapshot, GatewayError> {
        self.health.clone()
    }
}

/// Application state wired to the stubs.
pub fn create_test_state(config: Config, gateway: Arc<StubGateway>) -> Arc<AppState> {
    let allow_list = AllowList::from_config(config.auth.allowed_emails.as_deref());
    let search = SearchClient::new(
        &config.search.base_url,
        config.search.tavily_api_key.as_deref(),
    );
    Arc::new(AppState {
        config,
        authenticator: Arc::new(StubAuthenticator),
        allow_list,
        gateway,
        search,
    })
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    email: Option<String>,
    iss: String,
    aud: String,
    exp: u64,
    iat: u64,
}

/// Sign an RS256 ID token with [`TEST_RSA_PEM`].
pub fn generate_test_jwt(
    sub: &str,
    email: Option<&str>,
    issuer: &str,
    audience: &str,
    kid: &str,
) -> String {
    let now = Utc::now();
    let claims = TestClaims {
        sub: sub.to_string(),
        email: email.map(String::from),
        iss: issuer.to_string(),
        aud: audience.to_string(),
        exp: (now + Duration::hours(1)).timestamp() as u64,
        iat: now.timestamp() as u64,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    let key = EncodingKey::from_rsa_pem(TEST_RSA_PEM.as_bytes()).expect("test key must parse");
    encode(&header, &claims, &key).expect("test token must encode")
}
