//! Connection lifecycle for the Deriv WebSocket API
//!
//! Owns the transport. `connect` opens the socket, `authorize` performs the
//! token handshake and then starts the background reader that drains every
//! inbound message into the shared [`PendingQueue`]; from that point the
//! socket is only touched through the gateway, the feed, and `close`.

use std::sync::Arc;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::DerivError;
use crate::feed::TickFeed;
use crate::gateway::OrderGateway;
use crate::queue::PendingQueue;
use crate::router::MessageRouter;
use crate::transport::{Transport, WsTransport};
use crate::wire::{AuthMsg, AuthorizeRequest, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authorized,
    Closing,
    Closed,
}

/// Manages one persistent duplex connection to the venue
pub struct DerivClient {
    endpoint: String,
    state: ConnectionState,
    /// Held between connect() and authorize(), before the stream is split
    socket: Option<WsStream>,
    transport: Option<Arc<WsTransport>>,
    queue: Option<Arc<PendingQueue>>,
    reader: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl DerivClient {
    /// Build a client for `endpoint` (e.g. `wss://ws.derivws.com/websockets/v3`),
    /// appending the venue's required `app_id` query parameter.
    pub fn new(endpoint: &url::Url, app_id: &str) -> Self {
        let mut endpoint = endpoint.clone();
        endpoint
            .query_pairs_mut()
            .append_pair("app_id", app_id);
        Self {
            endpoint: endpoint.to_string(),
            state: ConnectionState::Disconnected,
            socket: None,
            transport: None,
            queue: None,
            reader: None,
            shutdown: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the transport. No-op if already connected.
    pub async fn connect(&mut self) -> Result<(), DerivError> {
        if self.socket.is_some() || self.transport.is_some() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        info!("[Deriv WS] connecting to {}", self.endpoint);
        let (socket, _) = connect_async(self.endpoint.as_str()).await.map_err(|err| {
            self.state = ConnectionState::Disconnected;
            DerivError::from(err)
        })?;
        self.socket = Some(socket);
        info!("[Deriv WS] connected");
        Ok(())
    }

    /// Send the auth request and await its reply directly on the socket —
    /// the reader is not running yet, so the first inbound message is ours.
    /// On success the stream is split, the pending queue is created, and the
    /// background reader starts.
    pub async fn authorize(&mut self, token: &str) -> Result<AuthMsg, DerivError> {
        let mut socket = self.socket.take().ok_or(DerivError::NotConnected)?;

        let request = AuthorizeRequest {
            authorize: token.to_string(),
        };
        socket
            .send(Message::Text(serde_json::to_string(&request)?.into()))
            .await?;

        let reply = loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => break Frame::decode(text.as_str()),
                Some(Ok(_)) => continue, // ping/pong noise before the reply
                Some(Err(err)) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(err.into());
                }
                None => {
                    self.state = ConnectionState::Disconnected;
                    return Err(DerivError::transport("connection closed during authorize"));
                }
            }
        };

        match reply {
            Frame::Auth(auth) => {
                let (sink, stream) = socket.split();
                let queue = Arc::new(PendingQueue::new());
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                let reader = tokio::spawn(read_loop(stream, Arc::clone(&queue), shutdown_rx));

                self.transport = Some(Arc::new(WsTransport::new(sink)));
                self.queue = Some(queue);
                self.reader = Some(reader);
                self.shutdown = Some(shutdown_tx);
                self.state = ConnectionState::Authorized;

                if let (Some(balance), Some(currency)) = (auth.balance, auth.currency.as_deref()) {
                    info!("[Deriv WS] authorized, balance {} {}", balance, currency);
                } else {
                    info!("[Deriv WS] authorized");
                }
                Ok(auth)
            }
            Frame::Error(err) => {
                self.state = ConnectionState::Disconnected;
                Err(DerivError::Auth(err.message))
            }
            other => {
                self.state = ConnectionState::Disconnected;
                Err(DerivError::auth(format!(
                    "unexpected authorize reply: {:?}",
                    other
                )))
            }
        }
    }

    /// Order placement handle. Available once authorized.
    pub fn order_gateway(&self) -> Result<OrderGateway, DerivError> {
        let (transport, queue) = self.shared_parts()?;
        Ok(OrderGateway::new(MessageRouter::new(transport, queue)))
    }

    /// Tick subscription handle. Available once authorized.
    pub fn tick_feed(&self) -> Result<TickFeed, DerivError> {
        let (transport, queue) = self.shared_parts()?;
        Ok(TickFeed::new(transport, queue))
    }

    fn shared_parts(&self) -> Result<(Arc<dyn Transport>, Arc<PendingQueue>), DerivError> {
        match (&self.transport, &self.queue) {
            (Some(transport), Some(queue)) => Ok((
                Arc::clone(transport) as Arc<dyn Transport>,
                Arc::clone(queue),
            )),
            _ => Err(DerivError::NotConnected),
        }
    }

    /// Cancel the reader, wait for it to exit, then close the transport and
    /// reset to pre-connect defaults. The reader always leaves a close
    /// sentinel behind, so consumers suspended on the queue wake up and
    /// terminate instead of hanging. Safe to call any number of times.
    pub async fn close(&mut self) {
        self.state = ConnectionState::Closing;

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.await {
                warn!("[Deriv WS] reader task panicked: {}", err);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
        self.queue = None;
        self.state = ConnectionState::Closed;
        info!("[Deriv WS] disconnected");
    }
}

/// Background reader: drains the socket into the queue until cancelled or
/// the transport fails. Content-blind except for decode/error detection —
/// every message becomes exactly one frame, and the loop always pushes one
/// final sentinel so blocked consumers observe the termination.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    queue: Arc<PendingQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                queue.push(Frame::closed());
                break;
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => queue.push(Frame::decode(text.as_str())),
                Some(Ok(Message::Close(_))) => {
                    info!("[Deriv WS] connection closed by server");
                    queue.push(Frame::closed());
                    break;
                }
                Some(Ok(_)) => {} // ping/pong handled by the protocol layer
                Some(Err(err)) => {
                    error!("[Deriv WS] receive error: {}", err);
                    queue.push(Frame::transport_error(err.to_string()));
                    break;
                }
                None => {
                    queue.push(Frame::closed());
                    break;
                }
            }
        }
    }
    debug!("[Deriv WS] reader task exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> DerivClient {
        let endpoint = url::Url::parse("wss://ws.derivws.com/websockets/v3").unwrap();
        DerivClient::new(&endpoint, "1089")
    }

    #[test]
    fn endpoint_carries_app_id() {
        let client = test_client();
        assert!(client.endpoint.contains("app_id=1089"));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut client = test_client();
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);

        // Second close reaches the same terminal state without error.
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn gateway_and_feed_require_authorization() {
        let client = test_client();
        assert!(matches!(
            client.order_gateway().unwrap_err(),
            DerivError::NotConnected
        ));
        assert!(matches!(
            client.tick_feed().unwrap_err(),
            DerivError::NotConnected
        ));
    }

    #[tokio::test]
    async fn authorize_without_connect_fails() {
        let mut client = test_client();
        assert!(matches!(
            client.authorize("token").await.unwrap_err(),
            DerivError::NotConnected
        ));
    }
}
