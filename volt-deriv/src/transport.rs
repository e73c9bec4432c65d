//! Outbound transport seam
//!
//! The router, gateway, and feed only need "send this JSON text"; hiding the
//! socket behind a trait keeps them unit-testable without a live connection.

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::DerivError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Sends one outbound text message over the duplex connection
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: String) -> Result<(), DerivError>;
}

/// Write half of the live WebSocket, shared by all senders
pub(crate) struct WsTransport {
    sink: Mutex<WsSink>,
}

impl WsTransport {
    pub(crate) fn new(sink: WsSink) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Close the write half; errors are irrelevant during teardown
    pub(crate) async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, payload: String) -> Result<(), DerivError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(payload.into()))
            .await
            .map_err(DerivError::from)
    }
}
