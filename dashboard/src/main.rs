use std::sync::Arc;

use gateway_client::GatewayClient;
use relay_dashboard::{app, AllowList, AppState, Config, JwksClient, SearchClient};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().any(|a| a == "--version" || a == "-V") {
        println!("relay-dashboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting relay dashboard v{}", env!("CARGO_PKG_VERSION"));

    let authenticator = JwksClient::new(
        &config.auth.oidc_issuer,
        config.auth.oidc_audience.as_deref(),
    )
    .await?;

    let allow_list = AllowList::from_config(config.auth.allowed_emails.as_deref());
    if allow_list.is_open() {
        tracing::warn!("ALLOWED_EMAILS is empty, every signed-in user is allowed");
    } else {
        tracing::info!("Allow-list has {} entries", allow_list.len());
    }

    tracing::info!(
        "Gateway at {} ({:?} handshake)",
        config.gateway.ws_url,
        config.gateway.handshake
    );
    let gateway = GatewayClient::new(config.gateway.clone());
    let search = SearchClient::new(
        &config.search.base_url,
        config.search.tavily_api_key.as_deref(),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        config,
        authenticator: Arc::new(authenticator),
        allow_list,
        gateway: Arc::new(gateway),
        search,
    });

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
