//! Error types for gateway calls.

/// Outcome of a failed gateway call.
///
/// Every call produces exactly one of these or a payload. Nothing is retried
/// internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The gateway rejected the `connect` request.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// No `connect.challenge` arrived within the challenge window.
    #[error("No connect challenge received")]
    ChallengeTimeout,

    /// The socket closed before the handshake (or the call) completed.
    #[error("Connection closed before request completed")]
    ConnectionClosed,

    /// The overall call deadline elapsed.
    #[error("Request timeout")]
    Timeout,

    /// Terminal `ok: false` response or nested `status: "error"`.
    #[error("{0}")]
    Call(String),

    /// A frame could not be parsed or had an unexpected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket-level failure (connect refused, TLS, write error).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => GatewayError::ConnectionClosed,
            other => GatewayError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GatewayError::Connect("bad token".to_string()).to_string(),
            "Connect failed: bad token"
        );
        assert_eq!(GatewayError::Timeout.to_string(), "Request timeout");
        assert_eq!(
            GatewayError::ChallengeTimeout.to_string(),
            "No connect challenge received"
        );
        assert_eq!(GatewayError::Call("boom".to_string()).to_string(), "boom");
    }

    #[test]
    fn test_json_error_is_protocol_error() {
        let err: GatewayError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[test]
    fn test_closed_socket_maps_to_connection_closed() {
        let err: GatewayError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert_eq!(err, GatewayError::ConnectionClosed);
    }
}
