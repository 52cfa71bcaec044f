//! Router error types
//!
//! None of these are fatal. The connection task logs them and moves on to
//! the next message.

use thiserror::Error;

use crate::connection::Role;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("malformed message: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("unknown switch: {0}")]
    UnknownSwitch(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("{message} not allowed from {role} connection")]
    RoleViolation { message: &'static str, role: Role },

    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] ledlink_transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ledlink_core::Error> for RouterError {
    fn from(e: ledlink_core::Error) -> Self {
        use ledlink_core::Error;
        match e {
            Error::DecodeError(msg) => RouterError::Decode(msg),
            Error::EncodeError(msg) => RouterError::Encode(msg),
            Error::UnknownSwitch(name) => RouterError::UnknownSwitch(name),
            Error::InvalidAction(action) => RouterError::InvalidAction(action),
        }
    }
}
