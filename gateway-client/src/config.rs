//! Configuration for the gateway client.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use relay_common::MAIN_SESSION_KEY;
use serde::Deserialize;

/// How the client authenticates during the `connect` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeMode {
    /// Bearer token only, `connect` is sent as soon as the socket opens.
    Token,
    /// Wait for a `connect.challenge` nonce and sign a `v2` device payload.
    #[default]
    Device,
    /// Sign a `v1` device payload without waiting for a challenge, for
    /// gateways that never issue one.
    DeviceV1,
}

/// Gateway connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub ws_url: String,
    /// Bearer token presented in `connect.auth.token`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub handshake: HandshakeMode,
    /// Overall deadline for one call, handshake included.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// How long the device handshake waits for `connect.challenge`.
    #[serde(default = "default_challenge_timeout_ms")]
    pub challenge_timeout_ms: u64,
    /// Agent session that chat messages are routed to.
    #[serde(default = "default_session_key")]
    pub session_key: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// Default values
fn default_call_timeout_ms() -> u64 {
    120_000
}
fn default_challenge_timeout_ms() -> u64 {
    10_000
}
fn default_session_key() -> String {
    MAIN_SESSION_KEY.to_string()
}
fn default_platform() -> String {
    std::env::consts::OS.to_string()
}
fn default_locale() -> String {
    "en-US".to_string()
}
fn default_user_agent() -> String {
    format!("relay-dashboard/{}", env!("CARGO_PKG_VERSION"))
}

impl GatewayConfig {
    /// Settings for `ws_url` with every other field at its default.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            token: None,
            handshake: HandshakeMode::default(),
            call_timeout_ms: default_call_timeout_ms(),
            challenge_timeout_ms: default_challenge_timeout_ms(),
            session_key: default_session_key(),
            platform: default_platform(),
            locale: default_locale(),
            user_agent: default_user_agent(),
        }
    }

    /// Load standalone gateway settings (used by `gateway-call`).
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (`GATEWAY_WS_URL`, `GATEWAY_TOKEN`, `GATEWAY_HANDSHAKE`, ...)
    /// 2. gateway.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("gateway").required(false))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// The bearer token, treating a blank value as absent.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_millis(self.challenge_timeout_ms)
    }
}
