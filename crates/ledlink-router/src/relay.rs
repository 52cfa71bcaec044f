//! Relay context
//!
//! Everything the relay mutates lives here, owned by the [`Router`] behind a
//! single lock so that each message is handled start to finish before the
//! next one begins.
//!
//! [`Router`]: crate::Router

use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Result;
use crate::registry::Registry;
use crate::state::SwitchStore;
use crate::{handler, lifecycle};

#[derive(Default)]
pub struct Relay {
    pub registry: Registry,
    pub switches: SwitchStore,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and route one inbound payload
    pub async fn handle_data(&mut self, conn: &Arc<Connection>, data: &[u8]) -> Result<()> {
        handler::handle_data(self, conn, data).await
    }

    /// Deregister a closed connection and notify observers if needed
    pub async fn handle_close(&mut self, conn: &Connection) {
        lifecycle::handle_close(self, conn).await
    }
}
