//! One-shot method calls against the gateway.

use std::time::Instant;

use futures_util::{Sink, Stream};
use relay_common::{
    AgentParams, HealthSnapshot, InboundFrame, OutboundFrame, AGENT_METHOD, HEALTH_METHOD,
};
use serde_json::{Map, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::connection::Connection;
use crate::device::DeviceKeyring;
use crate::error::{GatewayError, Result};
use crate::extract::extract_reply;
use crate::handshake::Handshake;

/// Gateway client.
///
/// Every call opens its own socket, handshakes, issues one request and closes
/// the socket again. Concurrent calls never share a connection. The device
/// keyring is shared by all calls made through one client, so keep a single
/// client per process.
pub struct GatewayClient {
    config: GatewayConfig,
    keyring: DeviceKeyring,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            keyring: DeviceKeyring::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Call `method` and return the terminal payload.
    ///
    /// The whole exchange, connect and handshake included, is bounded by the
    /// configured call timeout. On expiry the socket is dropped without a
    /// close handshake and nothing it still carries is read.
    pub async fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value> {
        let start = Instant::now();
        tracing::debug!("Calling gateway method {} at {}", method, self.config.ws_url);

        let exchange = async {
            let (stream, _) = connect_async(self.config.ws_url.as_str()).await?;
            let mut conn = Connection::new(stream);
            let result = self.exchange(&mut conn, method, params).await;
            conn.close().await;
            result
        };

        let result = match timeout(self.config.call_timeout(), exchange).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        match &result {
            Ok(_) => tracing::info!(
                method = %method,
                duration_ms = %start.elapsed().as_millis(),
                "Gateway call completed"
            ),
            Err(e) => tracing::warn!(
                method = %method,
                duration_ms = %start.elapsed().as_millis(),
                "Gateway call failed: {}",
                e
            ),
        }
        result
    }

    /// Send a chat message to the configured agent session and return the reply text.
    pub async fn send_chat(&self, text: &str) -> Result<String> {
        let params = AgentParams {
            session_key: self.config.session_key.clone(),
            message: text.to_string(),
        };
        let params = match serde_json::to_value(params)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let payload = self.call(AGENT_METHOD, params).await?;
        Ok(extract_reply(&payload))
    }

    /// Raw `health` payload.
    pub async fn health(&self) -> Result<Value> {
        self.call(HEALTH_METHOD, Map::new()).await
    }

    /// `health` payload parsed into the fields the dashboard uses.
    pub async fn health_snapshot(&self) -> Result<HealthSnapshot> {
        let payload = self.health().await?;
        serde_json::from_value(payload)
            .map_err(|e| GatewayError::Protocol(format!("invalid health payload: {}", e)))
    }

    /// Handshake, send the request, then read frames until the call settles.
    async fn exchange<S>(
        &self,
        conn: &mut Connection<S>,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Value>
    where
        S: Stream<Item = std::result::Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin,
    {
        Handshake::new(&self.config, &self.keyring)
            .perform(conn)
            .await?;

        let request = build_request(method, params);
        let mut pending = PendingCall::new(request.id(), method);
        conn.send(&request).await?;

        loop {
            let frame = conn.next_frame().await?;
            if let Some(outcome) = pending.accept(frame) {
                if pending.accepted() > 0 {
                    tracing::debug!(
                        "Call {} settled after {} accepted frames",
                        pending.id(),
                        pending.accepted()
                    );
                }
                return outcome;
            }
        }
    }
}

/// Build a `req` frame with a fresh correlation id and idempotency key.
pub fn build_request(method: &str, mut params: Map<String, Value>) -> OutboundFrame {
    params.insert(
        "idempotencyKey".to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );
    OutboundFrame::request(Uuid::new_v4().to_string(), method, Value::Object(params))
}

/// Progress reported in an `agent` response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Still running, a later frame on the same id will settle it.
    Accepted,
    /// The run failed even though the envelope said `ok`.
    Error,
    /// Anything else, including no status at all.
    Done,
}

impl RunStatus {
    pub fn of(payload: &Value) -> Self {
        match payload.get("status").and_then(Value::as_str) {
            Some("accepted") => RunStatus::Accepted,
            Some("error") => RunStatus::Error,
            _ => RunStatus::Done,
        }
    }
}

/// The one in-flight call on a connection.
///
/// Fed every frame in arrival order; settles exactly once.
#[derive(Debug)]
pub struct PendingCall {
    id: String,
    method: String,
    accepted: u32,
    settled: bool,
}

impl PendingCall {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            accepted: 0,
            settled: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of `accepted` progress frames seen so far.
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Feed one inbound frame. Returns the outcome when this frame settles
    /// the call, `None` when the call is still waiting. Once settled, every
    /// further frame is ignored.
    pub fn accept(&mut self, frame: InboundFrame) -> Option<Result<Value>> {
        if self.settled {
            return None;
        }
        let outcome = self.classify(frame)?;
        self.settled = true;
        Some(outcome)
    }

    fn classify(&mut self, frame: InboundFrame) -> Option<Result<Value>> {
        let res = match frame {
            InboundFrame::Event(event) => {
                tracing::debug!("Ignoring event {} while awaiting {}", event.event, self.method);
                return None;
            }
            InboundFrame::Res(res) if res.id != self.id => {
                tracing::warn!("Ignoring response for unknown request {}", res.id);
                return None;
            }
            InboundFrame::Res(res) => res,
        };

        if !res.ok {
            return Some(Err(GatewayError::Call(res.error_message())));
        }

        let payload = res.payload.clone().unwrap_or(Value::Null);
        if self.method != AGENT_METHOD {
            return Some(Ok(payload));
        }

        match RunStatus::of(&payload) {
            RunStatus::Accepted => {
                self.accepted += 1;
                tracing::debug!("Run {} accepted ({}), waiting for completion", self.id, self.accepted);
                None
            }
            RunStatus::Error => {
                let message = run_error_message(&payload)
                    .or_else(|| res.error.as_ref().and_then(|e| e.message.clone()))
                    .unwrap_or_else(|| "Unknown error".to_string());
                Some(Err(GatewayError::Call(message)))
            }
            RunStatus::Done => Some(Ok(payload)),
        }
    }
}

/// Error text nested in a failed run payload.
fn run_error_message(payload: &Value) -> Option<String> {
    if let Some(summary) = payload.get("summary").and_then(Value::as_str) {
        if !summary.trim().is_empty() {
            return Some(summary.trim().to_string());
        }
    }
    match payload.get("error") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(err) => err.get("message").and_then(Value::as_str).map(String::from),
        None => None,
    }
}
