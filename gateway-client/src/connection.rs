//! Frame-level I/O over one WebSocket.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use relay_common::{InboundFrame, OutboundFrame};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::error::{GatewayError, Result};

/// A single gateway socket, owned by exactly one call.
///
/// Generic over the underlying stream so the same code drives a real
/// `WebSocketStream` and an in-memory one.
pub struct Connection<S> {
    stream: S,
}

impl<S> Connection<S>
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn send(&mut self, frame: &OutboundFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        self.stream.send(Message::Text(json)).await?;
        tracing::debug!("Sent frame {}", frame.id());
        Ok(())
    }

    /// Wait for the next gateway frame, in transport order.
    ///
    /// Transport pings are answered here and never surface. A close frame or
    /// end of stream yields `ConnectionClosed`.
    pub async fn next_frame(&mut self) -> Result<InboundFrame> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return parse_frame(&text),
                Some(Ok(Message::Ping(data))) => {
                    self.stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("Gateway closed the connection");
                    return Err(GatewayError::ConnectionClosed);
                }
                Some(Ok(_)) => {} // Ignore binary and pong frames
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Send a close frame. Errors are irrelevant at this point.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close().await {
            tracing::debug!("Ignoring error while closing gateway socket: {}", e);
        }
    }
}

/// Parse one text frame.
pub fn parse_frame(text: &str) -> Result<InboundFrame> {
    serde_json::from_str(text)
        .map_err(|e| GatewayError::Protocol(format!("malformed frame: {}", e)))
}
