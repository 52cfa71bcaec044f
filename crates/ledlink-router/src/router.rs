//! Main router implementation
//!
//! The router is transport-agnostic: it accepts connections from anything
//! implementing `TransportServer` and runs one task per connection. All
//! tasks share one [`Relay`] behind a lock, so message handling and close
//! handling are serialized.
//!
//! # Example
//!
//! ```no_run
//! use ledlink_router::{Router, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new(RouterConfig::default());
//!
//!     // WebSocket (what the device and the browser UI use)
//!     router.serve_websocket("0.0.0.0:3000").await.unwrap();
//!
//!     // Or use any TransportServer implementation
//!     // router.serve_on(my_custom_server).await.unwrap();
//! }
//! ```

use dashmap::DashMap;
use ledlink_core::SwitchState;
use ledlink_transport::{TransportEvent, TransportReceiver, TransportSender, TransportServer};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

#[cfg(feature = "websocket")]
use ledlink_transport::{WebSocketConfig, WebSocketServer};

use crate::{
    connection::{Connection, ConnectionId},
    error::{Result, RouterError},
    relay::Relay,
};

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Server name, used in logs
    pub name: String,
    /// Maximum simultaneous connections (0 = unlimited)
    pub max_connections: usize,
    /// WebSocket settings
    #[cfg(feature = "websocket")]
    pub websocket: WebSocketConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name: "ledlink relay".to_string(),
            max_connections: 256,
            #[cfg(feature = "websocket")]
            websocket: WebSocketConfig::default(),
        }
    }
}

/// ledlink router
pub struct Router {
    config: RouterConfig,
    /// Open connections, registered or not
    connections: Arc<DashMap<ConnectionId, Arc<Connection>>>,
    /// Registry and switch state
    relay: Arc<Mutex<Relay>>,
    /// Running flag
    running: Arc<RwLock<bool>>,
    /// Wakes the accept loop on stop
    shutdown: Arc<Notify>,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            connections: Arc::new(DashMap::new()),
            relay: Arc::new(Mutex::new(Relay::new())),
            running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // =========================================================================
    // Serving
    // =========================================================================

    /// Serve using any TransportServer implementation.
    pub async fn serve_on<S>(&self, mut server: S) -> Result<()>
    where
        S: TransportServer + 'static,
        S::Sender: 'static,
        S::Receiver: 'static,
    {
        info!("{} accepting connections", self.config.name);
        *self.running.write() = true;

        while *self.running.read() {
            let accepted = tokio::select! {
                _ = self.shutdown.notified() => break,
                accepted = server.accept() => accepted,
            };

            match accepted {
                Ok((sender, receiver, addr)) => {
                    let sender: Arc<dyn TransportSender> = Arc::new(sender);
                    if self.at_capacity() {
                        warn!(
                            "Rejecting {}: {} connections open",
                            addr,
                            self.connections.len()
                        );
                        let _ = sender.close().await;
                        continue;
                    }
                    info!("New connection from {}", addr);
                    let conn = self.accept_connection(sender, addr);
                    self.spawn_connection(conn, receiver);
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }

        let _ = server.close().await;
        info!("{} stopped", self.config.name);
        Ok(())
    }

    /// Start the router on WebSocket.
    #[cfg(feature = "websocket")]
    pub async fn serve_websocket(&self, addr: &str) -> Result<()> {
        let server = WebSocketServer::bind(addr)
            .await?
            .with_config(self.config.websocket.clone());
        self.serve_on(server).await
    }

    fn at_capacity(&self) -> bool {
        self.config.max_connections > 0 && self.connections.len() >= self.config.max_connections
    }

    /// Internal clone for spawning connection tasks.
    /// Shares all Arc state with the original.
    fn clone_internal(&self) -> Self {
        Self {
            config: self.config.clone(),
            connections: Arc::clone(&self.connections),
            relay: Arc::clone(&self.relay),
            running: Arc::clone(&self.running),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Run one connection until it closes, then clean up after it
    fn spawn_connection(&self, conn: Arc<Connection>, mut receiver: impl TransportReceiver + 'static) {
        let router = self.clone_internal();

        tokio::spawn(async move {
            while *router.running.read() {
                match receiver.recv().await {
                    Some(TransportEvent::Data(data)) => {
                        if let Err(e) = router.handle_data(&conn, &data).await {
                            match e {
                                RouterError::Decode(_) => {
                                    debug!("Dropping payload from {}: {}", conn.addr, e)
                                }
                                _ => warn!("Dropped message from {}: {}", conn.addr, e),
                            }
                        }
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        info!("Client {} disconnected: {:?}", conn.addr, reason);
                        break;
                    }
                    Some(TransportEvent::Error(e)) => {
                        error!("Transport error from {}: {}", conn.addr, e);
                        break;
                    }
                    Some(TransportEvent::Connected) => {}
                    None => break,
                }
            }

            router.handle_close(&conn).await;
        });
    }

    // =========================================================================
    // Connection entry points
    // =========================================================================

    /// Track a newly accepted connection. Its role starts unassigned.
    pub fn accept_connection(&self, sender: Arc<dyn TransportSender>, addr: SocketAddr) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(sender, addr));
        self.connections.insert(conn.id, Arc::clone(&conn));
        conn
    }

    /// Handle one inbound payload from `conn`.
    ///
    /// Errors describe why a message was dropped; the connection stays open.
    pub async fn handle_data(&self, conn: &Arc<Connection>, data: &[u8]) -> Result<()> {
        let mut relay = self.relay.lock().await;
        relay.handle_data(conn, data).await
    }

    /// Handle `conn` closing or failing
    pub async fn handle_close(&self, conn: &Connection) {
        self.connections.remove(&conn.id);
        let mut relay = self.relay.lock().await;
        relay.handle_close(conn).await;
    }

    /// Stop the router
    pub fn stop(&self) {
        *self.running.write() = false;
        self.shutdown.notify_waiters();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Open connections, registered or not
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub async fn observer_count(&self) -> usize {
        self.relay.lock().await.registry.observer_count()
    }

    pub async fn device_connected(&self) -> bool {
        self.relay.lock().await.registry.device_connected()
    }

    /// Current switch values
    pub async fn switches(&self) -> SwitchState {
        self.relay.lock().await.switches.get()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}
