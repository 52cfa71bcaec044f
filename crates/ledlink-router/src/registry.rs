//! Connection registry
//!
//! Tracks the single device slot and the observer set. Roles are kept in a
//! side table keyed by connection ID; the transport objects themselves are
//! never tagged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::{Connection, ConnectionId, Role};
use crate::error::{Result, RouterError};

/// What `remove_on_close` found out about a departing connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Role the connection had registered as
    pub role: Role,
    /// Whether it was still the current device
    pub held_device_slot: bool,
}

#[derive(Default)]
pub struct Registry {
    /// Current device, if any
    device: Option<Arc<Connection>>,
    /// Registered observers
    observers: HashMap<ConnectionId, Arc<Connection>>,
    /// Role side table
    roles: HashMap<ConnectionId, Role>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `conn` the device.
    ///
    /// Replaces any previous device without closing it; the displaced
    /// connection is returned. Fails only if `conn` already registered as
    /// an observer.
    pub fn register_device(&mut self, conn: &Arc<Connection>) -> Result<Option<Arc<Connection>>> {
        self.assign_role(conn.id, Role::Device, "register as device")?;
        let previous = self.device.replace(Arc::clone(conn));
        Ok(previous.filter(|p| p.id != conn.id))
    }

    /// Add `conn` to the observer set. Registering twice is a no-op.
    pub fn register_observer(&mut self, conn: &Arc<Connection>) -> Result<()> {
        self.assign_role(conn.id, Role::Observer, "register as observer")?;
        self.observers.insert(conn.id, Arc::clone(conn));
        Ok(())
    }

    fn assign_role(&mut self, id: ConnectionId, role: Role, message: &'static str) -> Result<()> {
        let current = self.roles.entry(id).or_insert(role);
        if *current != role {
            return Err(RouterError::RoleViolation {
                message,
                role: *current,
            });
        }
        Ok(())
    }

    /// Role a connection registered as
    pub fn role(&self, id: &ConnectionId) -> Role {
        self.roles.get(id).copied().unwrap_or_default()
    }

    /// True only for the connection currently holding the device slot
    pub fn is_device(&self, id: &ConnectionId) -> bool {
        self.device.as_ref().is_some_and(|d| d.id == *id)
    }

    pub fn is_observer(&self, id: &ConnectionId) -> bool {
        self.observers.contains_key(id)
    }

    /// The current device, if present and still open
    pub fn device_connection(&self) -> Option<Arc<Connection>> {
        self.device
            .as_ref()
            .filter(|d| d.is_connected())
            .cloned()
    }

    /// Whether a device is registered and reachable
    pub fn device_connected(&self) -> bool {
        self.device_connection().is_some()
    }

    /// Snapshot of the observer set
    pub fn observers(&self) -> Vec<Arc<Connection>> {
        self.observers.values().cloned().collect()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Forget a closed connection. Safe for connections that never
    /// registered.
    pub fn remove_on_close(&mut self, id: &ConnectionId) -> Removal {
        let held_device_slot = self.is_device(id);
        if held_device_slot {
            self.device = None;
        }
        self.observers.remove(id);
        let role = self.roles.remove(id).unwrap_or_default();

        Removal {
            role,
            held_device_slot,
        }
    }
}
