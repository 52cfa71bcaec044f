//! Connection teardown

use ledlink_core::Message;
use tracing::{debug, info};

use crate::connection::{Connection, Role};
use crate::dispatch::broadcast_logged;
use crate::relay::Relay;

/// Handle a connection's close or transport error.
///
/// Any device close reports the relay's device status afterwards: `false`
/// when the current device left, `true` when a replaced device left while
/// its successor is still up. Never fails: anything that goes wrong here is
/// logged.
pub async fn handle_close(relay: &mut Relay, conn: &Connection) {
    let removal = relay.registry.remove_on_close(&conn.id);
    let uptime = conn.connected_at.elapsed();

    match removal.role {
        Role::Device => {
            if removal.held_device_slot {
                info!("Device {} disconnected after {:?}", conn.addr, uptime);
            } else {
                info!("Displaced device {} disconnected after {:?}", conn.addr, uptime);
            }
            let connected = relay.registry.device_connected();
            broadcast_logged(&relay.registry, &Message::esp32_connected(connected)).await;
        }
        Role::Observer => {
            info!(
                "Observer {} disconnected after {:?} ({} remaining)",
                conn.addr,
                uptime,
                relay.registry.observer_count()
            );
        }
        Role::Unassigned => {
            debug!("Unregistered connection {} closed after {:?}", conn.addr, uptime);
        }
    }

    if let Err(e) = conn.close().await {
        debug!("Close of {} reported: {}", conn.addr, e);
    }
}
