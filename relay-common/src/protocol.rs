//! WebSocket protocol types for dashboard-gateway communication.
//!
//! The gateway speaks JSON text frames over a persistent WebSocket. Every frame
//! carries a `type` field that selects its shape.
//!
//! # Frames
//!
//! - `req` (client -> gateway): a method call with a correlation `id`.
//! - `res` (gateway -> client): the answer to a `req` with the same `id`.
//!   Long-running methods may answer several times on one id before the
//!   terminal response.
//! - `event` (gateway -> client): unsolicited notifications. The only one the
//!   client acts on is `connect.challenge`, which carries the nonce that a
//!   device-authenticated handshake must sign.
//!
//! ## Connection Flow
//!
//! 1. Client opens the socket
//! 2. Gateway may push a `connect.challenge` event with a nonce
//! 3. Client sends a `connect` request (token, optionally a signed device proof)
//! 4. Gateway answers `res` with `ok: true` or an error shape
//! 5. Client issues exactly one method call and waits for its terminal `res`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version spoken by this client (used for both min and max).
pub const PROTOCOL_VERSION: u32 = 3;

/// Client id announced in `connect` and bound into device signatures.
pub const CLIENT_ID: &str = "gateway-client";

/// Client mode announced in `connect` and bound into device signatures.
pub const CLIENT_MODE: &str = "backend";

/// Role requested by the dashboard.
pub const OPERATOR_ROLE: &str = "operator";

/// Scopes requested by the dashboard, in signing order.
pub const OPERATOR_SCOPES: [&str; 2] = ["operator.read", "operator.write"];

pub const CONNECT_CHALLENGE_EVENT: &str = "connect.challenge";

pub const CONNECT_METHOD: &str = "connect";
pub const AGENT_METHOD: &str = "agent";
pub const HEALTH_METHOD: &str = "health";

/// Frames sent from client to gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// A method call.
    Req {
        id: String,
        method: String,
        params: Value,
    },
}

impl OutboundFrame {
    pub fn request(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        OutboundFrame::Req {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            OutboundFrame::Req { id, .. } => id,
        }
    }
}

/// Frames sent from gateway to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Response to a request, matched by id.
    Res(ResponseFrame),
    /// Out-of-band notification.
    Event(EventFrame),
}

/// Response to a `req` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResponseFrame {
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape {
                code: None,
                message: Some(message.into()),
                details: None,
            }),
        }
    }

    /// Error message carried by the frame, or a generic one if the gateway sent none.
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// Error details attached to a failed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Unsolicited gateway notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl EventFrame {
    pub fn challenge(nonce: impl Into<String>) -> Self {
        Self {
            event: CONNECT_CHALLENGE_EVENT.to_string(),
            payload: serde_json::json!({ "nonce": nonce.into() }),
            seq: None,
        }
    }

    pub fn is_challenge(&self) -> bool {
        self.event == CONNECT_CHALLENGE_EVENT
    }
}

/// Payload of a `connect.challenge` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Parameters of the `connect` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: String,
    pub scopes: Vec<String>,
    #[serde(default)]
    pub caps: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthParams>,
    pub locale: String,
    pub user_agent: String,
    /// Signed device identity. Absent in token-only handshakes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceProof>,
}

/// Client description sent in `connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Device identity proof: public key plus a signature over the canonical
/// device-auth payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProof {
    pub id: String,
    /// base64url (no padding) of the raw 32-byte Ed25519 public key.
    pub public_key: String,
    /// base64url (no padding) of the raw 64-byte signature.
    pub signature: String,
    /// Milliseconds since the Unix epoch at signing time.
    pub signed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Parameters of the `agent` method (before the idempotency key is merged in).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentParams {
    pub session_key: String,
    pub message: String,
}
