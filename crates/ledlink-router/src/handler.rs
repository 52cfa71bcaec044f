//! Inbound message handling
//!
//! Dispatch order, first match wins:
//! 1. `register` as `esp32`
//! 2. `register` as `browser`
//! 3. `led` from an observer
//! 4. `button` from the device
//!
//! Anything else is ignored.

use ledlink_core::{codec, DeviceKind, LedMessage, Message, StateMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::dispatch::{broadcast_logged, send_to, unicast_to_device};
use crate::error::{Result, RouterError};
use crate::relay::Relay;

/// Decode a payload and route it
pub async fn handle_data(relay: &mut Relay, conn: &Arc<Connection>, data: &[u8]) -> Result<()> {
    let message = codec::decode(data)?;
    handle_message(relay, conn, message).await
}

/// Route one decoded message from `conn`
pub async fn handle_message(relay: &mut Relay, conn: &Arc<Connection>, message: Message) -> Result<()> {
    match message {
        Message::Register(register) => match register.device {
            DeviceKind::Esp32 => register_device(relay, conn).await,
            DeviceKind::Browser => register_observer(relay, conn).await,
            DeviceKind::Other => {
                debug!("Ignoring registration of unknown device kind from {}", conn.addr);
                Ok(())
            }
        },

        Message::Led(led) => {
            if !relay.registry.is_observer(&conn.id) {
                return Err(RouterError::RoleViolation {
                    message: "led",
                    role: relay.registry.role(&conn.id),
                });
            }
            apply_led(relay, &led).await
        }

        Message::Button(_) => {
            if !relay.registry.is_device(&conn.id) {
                return Err(RouterError::RoleViolation {
                    message: "button",
                    role: relay.registry.role(&conn.id),
                });
            }
            info!("Button pressed");
            broadcast_logged(&relay.registry, &Message::button_pressed()).await;
            Ok(())
        }

        other => {
            debug!("Ignoring {} message from {}", other.type_name(), conn.addr);
            Ok(())
        }
    }
}

async fn register_device(relay: &mut Relay, conn: &Arc<Connection>) -> Result<()> {
    if let Some(previous) = relay.registry.register_device(conn)? {
        warn!(
            "Device {} replaced by {}; previous connection left open",
            previous.addr, conn.addr
        );
    }
    info!("Device registered from {}", conn.addr);

    let state = Message::State(relay.switches.snapshot());
    if let Err(e) = send_to(conn, &state).await {
        warn!("Could not send state to device: {}", e);
    }

    broadcast_logged(&relay.registry, &Message::esp32_connected(true)).await;
    Ok(())
}

async fn register_observer(relay: &mut Relay, conn: &Arc<Connection>) -> Result<()> {
    relay.registry.register_observer(conn)?;
    info!(
        "Observer registered from {} ({} total)",
        conn.addr,
        relay.registry.observer_count()
    );

    let reply = Message::State(
        StateMessage::from(relay.switches.get())
            .with_device_status(relay.registry.device_connected()),
    );
    send_to(conn, &reply).await
}

async fn apply_led(relay: &mut Relay, led: &LedMessage) -> Result<()> {
    let (color, action) = led.parse()?;
    relay.switches.set_switch(color, action.is_on());
    info!("LED {}: {}", color, action);

    if let Err(e) = unicast_to_device(&relay.registry, &Message::led(color, action)).await {
        warn!("LED command not forwarded: {}", e);
    }

    let state = Message::State(relay.switches.snapshot());
    broadcast_logged(&relay.registry, &state).await;
    Ok(())
}
