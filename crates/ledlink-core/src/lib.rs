//! ledlink Core
//!
//! Shared types for the ledlink relay, which bridges one embedded control
//! device (an ESP32 driving two LEDs and a push button) with any number of
//! browser observers.
//!
//! This crate provides:
//! - Wire message types ([`Message`]) tagged by their `type` field
//! - The fixed switch set ([`Switch`]) and its state ([`SwitchState`])
//! - JSON encoding/decoding ([`codec`])

pub mod codec;
pub mod error;
pub mod switch;
pub mod types;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use switch::{LedAction, Switch, SwitchState};
pub use types::*;

/// Default listening port when `PORT` is not set
pub const DEFAULT_PORT: u16 = 3000;

/// Environment variable carrying the listening port
pub const PORT_ENV: &str = "PORT";

/// Largest inbound payload the relay will look at
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
