//! Unicast and broadcast delivery
//!
//! Delivery is best-effort: nothing here retries, and a failed send never
//! removes a connection. Removal only happens through the close path.

use ledlink_core::{codec, Message};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Result, RouterError};
use crate::registry::Registry;

/// Send a message to one specific connection
pub async fn send_to(conn: &Connection, message: &Message) -> Result<()> {
    if !conn.is_connected() {
        return Err(RouterError::DeliveryFailure(format!(
            "{} to {} is not writable",
            message.type_name(),
            conn.addr
        )));
    }
    conn.send_message(message).await.map_err(|e| match e {
        RouterError::Transport(e) => {
            RouterError::DeliveryFailure(format!("{} to {}: {}", message.type_name(), conn.addr, e))
        }
        other => other,
    })
}

/// Send a message to the device, if one is connected.
///
/// A missing or closed device is reported as `DeliveryFailure`.
pub async fn unicast_to_device(registry: &Registry, message: &Message) -> Result<()> {
    match registry.device_connection() {
        Some(device) => send_to(&device, message).await,
        None => Err(RouterError::DeliveryFailure(format!(
            "no device connected, dropped {}",
            message.type_name()
        ))),
    }
}

/// Send a message to every writable observer.
///
/// Serializes once. Returns how many observers it reached.
pub async fn broadcast_to_observers(registry: &Registry, message: &Message) -> Result<usize> {
    let data = codec::encode(message)?;
    let mut delivered = 0;

    for observer in registry.observers() {
        if !observer.is_connected() {
            continue;
        }
        match observer.send(data.clone()).await {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Broadcast to {} failed: {}", observer.addr, e),
        }
    }

    debug!(
        "Broadcast {} to {}/{} observers",
        message.type_name(),
        delivered,
        registry.observer_count()
    );
    Ok(delivered)
}

/// Broadcast, logging instead of returning failures
pub(crate) async fn broadcast_logged(registry: &Registry, message: &Message) {
    if let Err(e) = broadcast_to_observers(registry, message).await {
        warn!("Broadcast of {} failed: {}", message.type_name(), e);
    }
}
