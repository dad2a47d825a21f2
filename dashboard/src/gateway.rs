//! The slice of the gateway the dashboard talks to.

use async_trait::async_trait;
use gateway_client::{GatewayClient, GatewayError};
use relay_common::HealthSnapshot;

/// Gateway operations used by the HTTP handlers.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a chat message to the main agent session, returning the reply text.
    async fn send_chat(&self, text: &str) -> Result<String, GatewayError>;

    async fn health(&self) -> Result<HealthSnapshot, GatewayError>;
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn send_chat(&self, text: &str) -> Result<String, GatewayError> {
        GatewayClient::send_chat(self, text).await
    }

    async fn health(&self) -> Result<HealthSnapshot, GatewayError> {
        self.health_snapshot().await
    }
}
