//! Configuration for the dashboard.

use std::env;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use gateway_client::GatewayConfig;
use serde::Deserialize;

/// Main configuration structure for the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cockpit: CockpitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Identity provider and allow-list.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// OIDC issuer whose ID tokens are accepted.
    #[serde(default = "default_oidc_issuer")]
    pub oidc_issuer: String,
    /// Expected `aud` claim (the OAuth client id). Not checked when unset.
    #[serde(default)]
    pub oidc_audience: Option<String>,
    /// Comma-separated e-mail addresses allowed in. Everyone when unset.
    #[serde(default)]
    pub allowed_emails: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oidc_issuer: default_oidc_issuer(),
            oidc_audience: None,
            allowed_emails: None,
        }
    }
}

/// Third-party web search (Tavily).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default = "default_tavily_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            base_url: default_tavily_url(),
        }
    }
}

/// Link to the gateway's own control UI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CockpitConfig {
    #[serde(default)]
    pub gateway_ui_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origins, or `*`.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_oidc_issuer() -> String {
    "https://accounts.google.com".to_string()
}
fn default_tavily_url() -> String {
    "https://api.tavily.com".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

/// Flat deployment variables and the keys they set.
const LEGACY_ENV: [(&str, &str); 6] = [
    ("GATEWAY_WS_URL", "gateway.ws_url"),
    ("GATEWAY_TOKEN", "gateway.token"),
    ("ALLOWED_EMAILS", "auth.allowed_emails"),
    ("TAVILY_API_KEY", "search.tavily_api_key"),
    ("GATEWAY_UI_URL", "cockpit.gateway_ui_url"),
    ("PORT", "server.port"),
];

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Flat deployment variables (GATEWAY_WS_URL, GATEWAY_TOKEN, ALLOWED_EMAILS, ...)
    /// 2. Environment variables (DASHBOARD__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder()
            // Set defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("logging.level", default_log_level())?
            // Load from config.toml if exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (DASHBOARD__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            let value = env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}
