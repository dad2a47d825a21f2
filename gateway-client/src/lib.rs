//! Gateway client for the relay dashboard.
//!
//! Opens one WebSocket per call, authenticates with a bearer token and
//! (optionally) a signed device identity, sends a single method call and
//! waits for its terminal response.

pub mod client;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod extract;
pub mod handshake;

pub use client::{build_request, GatewayClient, PendingCall, RunStatus};
pub use config::{GatewayConfig, HandshakeMode};
pub use device::{derive_device_id, verify_signature, DeviceAuthPayload, DeviceIdentity, DeviceKeyring};
pub use error::{GatewayError, Result};
pub use extract::{extract_reply, extract_text, RunEnvelope, NO_TEXT_PLACEHOLDER};
