//! Relay dashboard: an OIDC-gated web API over the agent gateway.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod routes;
pub mod search;
pub mod test_util;

pub use auth::{AllowList, AuthUser, Authenticator, JwksClient};
pub use config::Config;
pub use error::ApiError;
pub use gateway::Gateway;
pub use search::SearchClient;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Verifies bearer ID tokens.
    pub authenticator: Arc<dyn Authenticator>,
    pub allow_list: AllowList,
    pub gateway: Arc<dyn Gateway>,
    pub search: SearchClient,
}

/// Build the CORS layer from a comma-separated origin list, `*` meaning any.
pub fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Assemble the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(routes::chat::router(state.clone()))
        .merge(routes::status::router(state.clone()))
        .merge(routes::costs::router(state.clone()))
        .merge(routes::search::router(state.clone()))
        .merge(routes::cockpit::router(state.clone()))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    Router::new()
        .merge(routes::health::router())
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors_layer(&state.config.cors.origins))
        .layer(TraceLayer::new_for_http())
}
