//! The `connect` handshake.
//!
//! Three flows, chosen by [`HandshakeMode`]:
//!
//! - **token**: send `connect` with the bearer token immediately.
//! - **device**: wait for `connect.challenge`, sign a `v2` payload bound to
//!   its nonce, then send `connect` with the device proof.
//! - **device_v1**: sign a `v1` payload (no nonce) and send `connect`
//!   immediately.
//!
//! Nothing but `connect` is sent until the gateway answers it with `ok: true`.

use std::collections::HashMap;

use futures_util::{Sink, Stream};
use relay_common::{
    AuthParams, ChallengePayload, ClientInfo, ConnectParams, DeviceProof, InboundFrame,
    OutboundFrame, CLIENT_ID, CLIENT_MODE, CONNECT_METHOD, OPERATOR_ROLE, OPERATOR_SCOPES,
    PROTOCOL_VERSION,
};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use uuid::Uuid;

use crate::config::{GatewayConfig, HandshakeMode};
use crate::connection::Connection;
use crate::device::{DeviceAuthPayload, DeviceKeyring};
use crate::error::{GatewayError, Result};

pub struct Handshake<'a> {
    config: &'a GatewayConfig,
    keyring: &'a DeviceKeyring,
}

impl<'a> Handshake<'a> {
    pub fn new(config: &'a GatewayConfig, keyring: &'a DeviceKeyring) -> Self {
        Self { config, keyring }
    }

    /// Run the handshake on a fresh connection. Returns the gateway's
    /// `hello` payload once the connection is ready for a method call.
    pub async fn perform<S>(&self, conn: &mut Connection<S>) -> Result<Value>
    where
        S: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin,
    {
        let device = match self.config.handshake {
            HandshakeMode::Token => None,
            HandshakeMode::DeviceV1 => Some(self.device_proof(None)),
            HandshakeMode::Device => {
                let nonce = self.await_challenge(conn).await?;
                Some(self.device_proof(Some(nonce)))
            }
        };

        let connect_id = Uuid::new_v4().to_string();
        let params = serde_json::to_value(self.connect_params(device))?;
        conn.send(&OutboundFrame::request(&connect_id, CONNECT_METHOD, params))
            .await?;

        loop {
            match conn.next_frame().await? {
                InboundFrame::Res(res) if res.id == connect_id => {
                    if res.ok {
                        tracing::info!("Gateway handshake complete ({:?})", self.config.handshake);
                        return Ok(res.payload.unwrap_or(Value::Null));
                    }
                    let message = res.error_message();
                    tracing::warn!("Gateway rejected connect: {}", message);
                    return Err(GatewayError::Connect(message));
                }
                InboundFrame::Res(res) => {
                    tracing::warn!("Ignoring response {} during handshake", res.id);
                }
                InboundFrame::Event(event) => {
                    tracing::debug!("Ignoring event {} during handshake", event.event);
                }
            }
        }
    }

    /// Wait for `connect.challenge` and return its nonce.
    async fn await_challenge<S>(&self, conn: &mut Connection<S>) -> Result<String>
    where
        S: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin,
    {
        match timeout(self.config.challenge_timeout(), next_challenge(conn)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "No connect challenge within {} ms",
                    self.config.challenge_timeout_ms
                );
                Err(GatewayError::ChallengeTimeout)
            }
        }
    }

    fn device_proof(&self, nonce: Option<String>) -> DeviceProof {
        let identity = self.keyring.identity();
        let payload = DeviceAuthPayload {
            device_id: identity.device_id().to_string(),
            client_id: CLIENT_ID.to_string(),
            client_mode: CLIENT_MODE.to_string(),
            role: OPERATOR_ROLE.to_string(),
            scopes: scopes(),
            signed_at_ms: chrono::Utc::now().timestamp_millis(),
            token: self.config.token().map(String::from),
            nonce,
        };
        tracing::debug!(
            "Signing {} device payload for {}",
            payload.version(),
            identity.device_id()
        );
        identity.prove(&payload)
    }

    /// Parameters of the `connect` request.
    pub fn connect_params(&self, device: Option<DeviceProof>) -> ConnectParams {
        ConnectParams {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client: ClientInfo {
                id: CLIENT_ID.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                platform: self.config.platform.clone(),
                mode: CLIENT_MODE.to_string(),
            },
            role: OPERATOR_ROLE.to_string(),
            scopes: scopes(),
            caps: vec![],
            commands: vec![],
            permissions: HashMap::new(),
            auth: self.config.token().map(|token| AuthParams {
                token: Some(token.to_string()),
            }),
            locale: self.config.locale.clone(),
            user_agent: self.config.user_agent.clone(),
            device,
        }
    }
}

async fn next_challenge<S>(conn: &mut Connection<S>) -> Result<String>
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Unpin,
{
    loop {
        match conn.next_frame().await? {
            InboundFrame::Event(event) if event.is_challenge() => {
                let challenge: ChallengePayload = serde_json::from_value(event.payload)
                    .map_err(|e| GatewayError::Protocol(format!("invalid connect.challenge: {}", e)))?;
                if challenge.nonce.is_empty() {
                    return Err(GatewayError::Protocol(
                        "connect.challenge without nonce".to_string(),
                    ));
                }
                tracing::debug!("Received connect challenge");
                return Ok(challenge.nonce);
            }
            InboundFrame::Event(event) => {
                tracing::debug!("Ignoring event {} before challenge", event.event);
            }
            InboundFrame::Res(res) => {
                tracing::warn!("Ignoring response {} before challenge", res.id);
            }
        }
    }
}

fn scopes() -> Vec<String> {
    OPERATOR_SCOPES.iter().map(|s| s.to_string()).collect()
}
