//! Common test helpers and utilities for ledlink tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A recording in-memory sender for driving the relay without sockets
//! - A test relay with RAII cleanup and a small JSON WebSocket client

use async_trait::async_trait;
use bytes::Bytes;
use ledlink_core::DeviceKind;
use ledlink_router::{Router, RouterConfig};
use ledlink_transport::{
    Transport, TransportError, TransportEvent, TransportReceiver, TransportSender,
    WebSocketReceiver, WebSocketSender, WebSocketTransport,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available TCP port for testing
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Recording Sender - in-memory TransportSender
// ============================================================================

/// A sender that records everything the relay writes to it.
///
/// Clones share the same buffer, so a test can keep one handle while the
/// relay owns another.
#[derive(Clone)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<Bytes>>>,
    connected: Arc<AtomicBool>,
    count: Arc<AtomicU32>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Every payload received so far, parsed as JSON
    pub fn messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|b| serde_json::from_slice(b).expect("relay sent non-JSON"))
            .collect()
    }

    /// Payloads whose `type` field equals `kind`
    pub fn messages_of_type(&self, kind: &str) -> Vec<Value> {
        self.messages()
            .into_iter()
            .filter(|m| m["type"] == kind)
            .collect()
    }

    pub fn last(&self) -> Option<Value> {
        self.messages().pop()
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }

    /// Mark the connection as no longer writable
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Wait until at least `n` payloads have been recorded
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportSender for RecordingSender {
    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(data);
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.disconnect();
        Ok(())
    }
}

// ============================================================================
// Test Relay - RAII wrapper with proper cleanup
// ============================================================================

/// A relay served on a free loopback port, stopped on drop
pub struct TestRelay {
    port: u16,
    router: Arc<Router>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestRelay {
    /// Start a test relay with default configuration
    pub async fn start() -> Self {
        Self::start_with_config(RouterConfig {
            name: "Test Relay".to_string(),
            ..Default::default()
        })
        .await
    }

    /// Start a test relay with custom configuration
    pub async fn start_with_config(config: RouterConfig) -> Self {
        let port = find_available_port().await;
        let addr = format!("127.0.0.1:{}", port);
        let router = Arc::new(Router::new(config));

        let serving = Arc::clone(&router);
        let handle = tokio::spawn(async move {
            let _ = serving.serve_websocket(&addr).await;
        });

        let listening = wait_for(
            || async move {
                tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port))
                    .await
                    .is_ok()
            },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT,
        )
        .await;
        assert!(listening, "test relay did not start listening");

        // The readiness check above was itself an accepted socket
        let serving_router: &Router = &router;
        let drained = wait_for(
            || async move { serving_router.connection_count() == 0 },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT,
        )
        .await;
        assert!(drained, "test relay kept the readiness socket open");

        Self {
            port,
            router,
            handle: Some(handle),
        }
    }

    /// Get the WebSocket URL for this relay
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The router behind this relay, for inspecting state
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Connect a raw client
    pub async fn connect(&self) -> TestClient {
        TestClient::connect(&self.url()).await
    }

    /// Connect and register in one step, consuming the registration reply
    pub async fn connect_as(&self, kind: DeviceKind) -> TestClient {
        let mut client = self.connect().await;
        client.register(kind).await;
        client
            .recv_type("state")
            .await
            .expect("registration should be answered with state");
        client
    }

    /// Stop the relay explicitly (also happens on drop)
    pub fn stop(&mut self) {
        self.router.stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Test Client - JSON over WebSocket
// ============================================================================

/// A WebSocket client speaking the relay's JSON messages
pub struct TestClient {
    sender: WebSocketSender,
    receiver: WebSocketReceiver,
}

impl TestClient {
    pub async fn connect(url: &str) -> Self {
        let (sender, receiver) = timeout(DEFAULT_TIMEOUT, WebSocketTransport::connect(url))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        Self { sender, receiver }
    }

    /// Send a raw text payload.
    ///
    /// Failures are ignored; tests observe them as missing replies.
    pub async fn send_raw(&self, payload: &str) {
        let _ = self
            .sender
            .send(Bytes::copy_from_slice(payload.as_bytes()))
            .await;
    }

    pub async fn send_json(&self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn register(&self, kind: DeviceKind) {
        let device = match kind {
            DeviceKind::Esp32 => "esp32",
            DeviceKind::Browser => "browser",
            DeviceKind::Other => "other",
        };
        self.send_json(json!({"type": "register", "device": device}))
            .await;
    }

    pub async fn led(&self, color: &str, action: &str) {
        self.send_json(json!({"type": "led", "color": color, "action": action}))
            .await;
    }

    pub async fn press_button(&self) {
        self.send_json(json!({"type": "button"})).await;
    }

    /// Next JSON message, or `None` on timeout or close
    pub async fn recv_json_within(&mut self, max_wait: Duration) -> Option<Value> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match timeout(remaining, self.receiver.recv()).await.ok()?? {
                TransportEvent::Data(data) => return serde_json::from_slice(&data).ok(),
                TransportEvent::Connected => continue,
                _ => return None,
            }
        }
    }

    pub async fn recv_json(&mut self) -> Option<Value> {
        self.recv_json_within(DEFAULT_TIMEOUT).await
    }

    /// Skip messages until one of the given `type` arrives
    pub async fn recv_type(&mut self, kind: &str) -> Option<Value> {
        loop {
            let msg = self.recv_json().await?;
            if msg["type"] == kind {
                return Some(msg);
            }
        }
    }

    /// True if nothing arrives within `quiet`
    pub async fn is_silent_for(&mut self, quiet: Duration) -> bool {
        self.recv_json_within(quiet).await.is_none()
    }

    pub async fn close(&self) {
        let _ = self.sender.close().await;
    }
}
