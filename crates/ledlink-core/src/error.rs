//! Error types for ledlink

use thiserror::Error;

/// Result type alias for ledlink core operations
pub type Result<T> = std::result::Result<T, Error>;

/// ledlink core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// JSON encoding error
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Payload is not a well-formed message
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Switch name outside the fixed set
    #[error("unknown switch: {0}")]
    UnknownSwitch(String),

    /// LED action other than "on"/"off"
    #[error("invalid action: {0}")]
    InvalidAction(String),
}
