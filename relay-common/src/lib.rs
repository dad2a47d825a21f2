//! Relay Common Types
//!
//! Wire types shared by the gateway client and the dashboard.

pub mod health;
pub mod protocol;

pub use health::{HealthSnapshot, RecentSessions, SessionEntry, MAIN_SESSION_KEY};
pub use protocol::{
    AgentParams, AuthParams, ChallengePayload, ClientInfo, ConnectParams, DeviceProof,
    ErrorShape, EventFrame, InboundFrame, OutboundFrame, ResponseFrame, AGENT_METHOD,
    CLIENT_ID, CLIENT_MODE, CONNECT_CHALLENGE_EVENT, CONNECT_METHOD, HEALTH_METHOD,
    OPERATOR_ROLE, OPERATOR_SCOPES, PROTOCOL_VERSION,
};
