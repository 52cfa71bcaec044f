//! ledlink Transport Layer
//!
//! The relay only needs a handful of things from a connection: send bytes,
//! ask whether it is still open, and hear about data, close and errors.
//! Those are captured by the traits in [`traits`]; [`websocket`] is the
//! implementation the relay binary serves on.

pub mod error;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Transport, TransportEvent, TransportReceiver, TransportSender, TransportServer};

#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConfig, WebSocketReceiver, WebSocketSender, WebSocketServer, WebSocketTransport,
};
