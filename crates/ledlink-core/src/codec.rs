//! JSON codec
//!
//! Clients speak plain JSON objects, one per WebSocket frame.

use crate::types::Message;
use crate::{Error, Result};
use bytes::Bytes;

/// Encode a message to JSON
pub fn encode(message: &Message) -> Result<Bytes> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| Error::EncodeError(e.to_string()))
}

/// Decode a message from JSON
pub fn decode(data: &[u8]) -> Result<Message> {
    serde_json::from_slice(data).map_err(|e| Error::DecodeError(e.to_string()))
}
