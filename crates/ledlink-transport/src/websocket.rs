//! WebSocket transport implementation
//!
//! Both the ESP32 firmware and the browser UI speak JSON over text frames,
//! so outbound payloads go out as text whenever they are valid UTF-8.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{
    Transport, TransportEvent, TransportReceiver, TransportSender, TransportServer,
};

use ledlink_core::MAX_MESSAGE_SIZE;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Inbound frames larger than this are dropped
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before sends start failing
    pub send_queue: usize,
    /// How long an accepted socket may take to complete the upgrade
    pub handshake_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            send_queue: 100,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// WebSocket transport
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            config: WebSocketConfig::default(),
        }
    }

    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of one socket as seen by its sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    /// TCP accepted, upgrade still in flight
    Handshaking,
    Open,
    Closed,
}

/// WebSocket sender
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    state: Arc<Mutex<LinkState>>,
}

#[async_trait]
impl TransportSender for WebSocketSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let frame = match String::from_utf8(data.to_vec()) {
            Ok(text) => WsMessage::Text(text),
            Err(e) => WsMessage::Binary(e.into_bytes()),
        };

        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(TransportError::SendFailed("send queue full".to_string()))
            }
            Err(TrySendError::Closed(_)) => {
                *self.state.lock() = LinkState::Closed;
                Err(TransportError::NotConnected)
            }
        }
    }

    fn is_connected(&self) -> bool {
        *self.state.lock() == LinkState::Open && !self.tx.is_closed()
    }

    async fn close(&self) -> Result<()> {
        // Queued even mid-handshake; the writer flushes it once upgraded
        let _ = self.tx.try_send(WsMessage::Close(None));
        *self.state.lock() = LinkState::Closed;
        Ok(())
    }
}

/// WebSocket receiver
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// The socket-facing ends of a connection's channels, held until the
/// stream is ready to be driven.
struct LinkIo {
    send_rx: mpsc::Receiver<WsMessage>,
    event_tx: mpsc::Sender<TransportEvent>,
    state: Arc<Mutex<LinkState>>,
    max_message_size: usize,
}

fn link(config: &WebSocketConfig, initial: LinkState) -> (WebSocketSender, WebSocketReceiver, LinkIo) {
    let (send_tx, send_rx) = mpsc::channel::<WsMessage>(config.send_queue.max(1));
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);
    let state = Arc::new(Mutex::new(initial));

    let sender = WebSocketSender {
        tx: send_tx,
        state: state.clone(),
    };
    let receiver = WebSocketReceiver { rx: event_rx };
    let io = LinkIo {
        send_rx,
        event_tx,
        state,
        max_message_size: config.max_message_size,
    };

    (sender, receiver, io)
}

impl LinkIo {
    /// Mark the link open unless it was closed while handshaking
    fn open(&self) {
        let mut state = self.state.lock();
        if *state == LinkState::Handshaking {
            *state = LinkState::Open;
        }
    }

    /// Give up on a link that never upgraded
    async fn fail(self, reason: String) {
        *self.state.lock() = LinkState::Closed;
        let _ = self
            .event_tx
            .send(TransportEvent::Disconnected {
                reason: Some(reason),
            })
            .await;
    }

    /// Split an upgraded stream into a writer task and a reader task.
    fn run<S>(self, ws_stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.open();

        let LinkIo {
            mut send_rx,
            event_tx,
            state,
            max_message_size,
        } = self;
        let (write, read) = ws_stream.split();
        let state_write = state.clone();
        let state_read = state;

        // Writer task
        tokio::spawn(async move {
            let mut write = write;
            while let Some(msg) = send_rx.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = write.send(msg).await {
                    debug!("WebSocket write error: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            *state_write.lock() = LinkState::Closed;
        });

        // Reader task
        tokio::spawn(async move {
            let mut read = read;

            let _ = event_tx.send(TransportEvent::Connected).await;

            let mut reason = None;
            while let Some(result) = read.next().await {
                match result {
                    Ok(msg) => {
                        let data = match msg {
                            WsMessage::Text(text) => Bytes::from(text),
                            WsMessage::Binary(data) => Bytes::from(data),
                            WsMessage::Close(frame) => {
                                reason = frame.map(|f| f.reason.to_string());
                                break;
                            }
                            // Pong replies are queued by tungstenite itself
                            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                        };

                        if data.len() > max_message_size {
                            warn!(
                                "Dropping {} byte frame (limit {})",
                                data.len(),
                                max_message_size
                            );
                            continue;
                        }

                        if event_tx.send(TransportEvent::Data(data)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }

            *state_read.lock() = LinkState::Closed;
            let _ = event_tx
                .send(TransportEvent::Disconnected { reason })
                .await;
        });
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(url: &str) -> Result<(Self::Sender, Self::Receiver)> {
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("WebSocket connected, response: {:?}", response.status());

        let (sender, receiver, io) = link(&WebSocketConfig::default(), LinkState::Open);
        io.run(ws_stream);
        Ok((sender, receiver))
    }
}

/// WebSocket server
pub struct WebSocketServer {
    listener: tokio::net::TcpListener,
    config: WebSocketConfig,
}

impl WebSocketServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!("WebSocket server listening on {}", addr);

        Ok(Self {
            listener,
            config: WebSocketConfig::default(),
        })
    }

    pub fn with_config(mut self, config: WebSocketConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl TransportServer for WebSocketServer {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    /// Returns as soon as TCP is accepted. The upgrade runs in its own task,
    /// so a peer that never sends it cannot hold up the next accept.
    async fn accept(&mut self) -> Result<(Self::Sender, Self::Receiver, SocketAddr)> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("Accepted TCP connection from {}", addr);

        let (sender, receiver, io) = link(&self.config, LinkState::Handshaking);
        let handshake_timeout = self.config.handshake_timeout;

        tokio::spawn(async move {
            match timeout(handshake_timeout, tokio_tungstenite::accept_async(stream)).await {
                Ok(Ok(ws_stream)) => {
                    debug!("WebSocket upgrade complete for {}", addr);
                    io.run(ws_stream);
                }
                Ok(Err(e)) => {
                    debug!("WebSocket upgrade failed for {}: {}", addr, e);
                    io.fail(format!("handshake failed: {}", e)).await;
                }
                Err(_) => {
                    warn!("WebSocket upgrade from {} timed out after {:?}", addr, handshake_timeout);
                    io.fail("handshake timed out".to_string()).await;
                }
            }
        });

        Ok((sender, receiver, addr))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }

    async fn close(&self) -> Result<()> {
        // TCP listener doesn't need explicit close
        Ok(())
    }
}
