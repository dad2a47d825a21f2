//! Scripted in-process gateway for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gateway_client::{GatewayConfig, HandshakeMode};
use relay_common::{EventFrame, InboundFrame, OutboundFrame, ResponseFrame};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// A request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub id: String,
    pub method: String,
    pub params: Value,
}

/// Server side of one client connection.
pub struct GatewaySocket {
    ws: WebSocketStream<TcpStream>,
}

impl GatewaySocket {
    /// Next request from the client, or `None` once it has gone away.
    pub async fn next_request(&mut self) -> Option<SeenRequest> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let OutboundFrame::Req { id, method, params } =
                        serde_json::from_str(&text).expect("client sent a malformed frame");
                    return Some(SeenRequest { id, method, params });
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                _ => return None,
            }
        }
    }

    pub async fn expect_request(&mut self, method: &str) -> SeenRequest {
        let request = self
            .next_request()
            .await
            .unwrap_or_else(|| panic!("connection closed while waiting for {}", method));
        assert_eq!(request.method, method);
        request
    }

    pub async fn send_raw(&mut self, text: impl Into<String>) {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .expect("failed to send frame");
    }

    pub async fn send_frame(&mut self, frame: InboundFrame) {
        let text = serde_json::to_string(&frame).unwrap();
        self.send_raw(text).await;
    }

    pub async fn challenge(&mut self, nonce: &str) {
        self.send_frame(InboundFrame::Event(EventFrame::challenge(nonce)))
            .await;
    }

    pub async fn reply_ok(&mut self, id: &str, payload: Value) {
        self.send_frame(InboundFrame::Res(ResponseFrame::success(id, payload)))
            .await;
    }

    pub async fn reply_err(&mut self, id: &str, message: &str) {
        self.send_frame(InboundFrame::Res(ResponseFrame::failure(id, message)))
            .await;
    }

    pub async fn ping(&mut self, payload: &[u8]) {
        self.ws
            .send(Message::Ping(payload.to_vec()))
            .await
            .expect("failed to send ping");
    }

    /// Payload of the next pong, or `None` if something else arrives first.
    pub async fn next_pong(&mut self) -> Option<Vec<u8>> {
        let next = tokio::time::timeout(Duration::from_secs(2), self.ws.next()).await;
        match next {
            Ok(Some(Ok(Message::Pong(data)))) => Some(data),
            _ => None,
        }
    }

    /// Accept the `connect` request of a token-only handshake.
    pub async fn accept_connect(&mut self) -> SeenRequest {
        let connect = self.expect_request("connect").await;
        self.reply_ok(&connect.id, serde_json::json!({"type": "hello-ok", "protocol": 3}))
            .await;
        connect
    }

    /// Whether the client goes away within two seconds without sending
    /// another request.
    pub async fn client_closed(&mut self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(2), self.next_request()).await,
            Ok(None)
        )
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Serve `count` connections sequentially, running `script` for each.
/// Returns the client URL and a handle yielding every script result.
pub async fn serve<F, Fut, T>(count: usize, script: F) -> (String, JoinHandle<Vec<T>>)
where
    F: Fn(GatewaySocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            results.push(script(GatewaySocket { ws }).await);
        }
        results
    });

    (format!("ws://{}", addr), handle)
}

/// Serve a single connection.
pub async fn serve_once<F, Fut, T>(script: F) -> (String, JoinHandle<Vec<T>>)
where
    F: Fn(GatewaySocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    serve(1, script).await
}

pub fn test_config(url: &str, mode: HandshakeMode) -> GatewayConfig {
    let mut config = GatewayConfig::new(url);
    config.token = Some("test-token".to_string());
    config.handshake = mode;
    config.call_timeout_ms = 5_000;
    config.challenge_timeout_ms = 1_000;
    config
}
