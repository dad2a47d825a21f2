//! gateway-call - issue a single gateway call from the command line.
//!
//! Usage:
//!   gateway-call health
//!   gateway-call agent <message...>

use std::env;

use gateway_client::{GatewayClient, GatewayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("usage: gateway-call health | gateway-call agent <message...>");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("gateway-call {}", VERSION);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = GatewayConfig::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. Set GATEWAY_WS_URL (and GATEWAY_TOKEN) or provide gateway.toml.",
            e
        )
    })?;
    let client = GatewayClient::new(config);

    match args.first().map(String::as_str) {
        Some("health") => {
            let payload = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Some("agent") if args.len() > 1 => {
            let message = args[1..].join(" ");
            let reply = client.send_chat(&message).await?;
            println!("{}", reply);
        }
        _ => {
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}
