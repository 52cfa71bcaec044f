//! Connection handles

use bytes::Bytes;
use ledlink_core::{codec, Message};
use ledlink_transport::{TransportError, TransportSender};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::Result;

/// Connection identifier, assigned at accept time
pub type ConnectionId = Uuid;

/// What a connection registered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Unassigned,
    Device,
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Unassigned => "unassigned",
            Role::Device => "device",
            Role::Observer => "observer",
        })
    }
}

/// A client connection as seen by the relay.
///
/// The relay never owns the socket; it only holds the sending half the
/// transport handed it.
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Remote address
    pub addr: SocketAddr,
    /// Transport sender for this connection
    sender: Arc<dyn TransportSender>,
    /// Accept time
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(sender: Arc<dyn TransportSender>, addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            addr,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send raw bytes to this connection
    pub async fn send(&self, data: Bytes) -> std::result::Result<(), TransportError> {
        self.sender.send(data).await
    }

    /// Encode and send a message
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let data = codec::encode(message)?;
        self.send(data).await?;
        Ok(())
    }

    /// Open and writable
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    pub async fn close(&self) -> std::result::Result<(), TransportError> {
        self.sender.close().await
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}
