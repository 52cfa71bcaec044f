//! Relay behaviour tests
//!
//! Drive the router directly with in-memory connections:
//! - Registration of device and observers
//! - LED commands and state fan-out
//! - Button events
//! - Disconnect handling
//! - Malformed and unauthorised input

use ledlink_core::SwitchState;
use ledlink_router::{Router, RouterError};
use ledlink_test_utils::RecordingSender;
use ledlink_router::Connection;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Accept a connection backed by a recording sender
fn connect(router: &Router, port: u16) -> (Arc<Connection>, RecordingSender) {
    let sender = RecordingSender::new();
    let conn = router.accept_connection(Arc::new(sender.clone()), addr(port));
    (conn, sender)
}

async fn send(router: &Router, conn: &Arc<Connection>, value: serde_json::Value) -> Result<(), RouterError> {
    router.handle_data(conn, value.to_string().as_bytes()).await
}

async fn register_device(router: &Router, port: u16) -> (Arc<Connection>, RecordingSender) {
    let (conn, sender) = connect(router, port);
    send(router, &conn, json!({"type": "register", "device": "esp32"}))
        .await
        .unwrap();
    (conn, sender)
}

async fn register_observer(router: &Router, port: u16) -> (Arc<Connection>, RecordingSender) {
    let (conn, sender) = connect(router, port);
    send(router, &conn, json!({"type": "register", "device": "browser"}))
        .await
        .unwrap();
    (conn, sender)
}

async fn led(router: &Router, conn: &Arc<Connection>, color: &str, action: &str) -> Result<(), RouterError> {
    send(router, conn, json!({"type": "led", "color": color, "action": action})).await
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_device_registration_gets_state_and_announces() {
    let router = Router::default();
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    let (_device, device_rx) = register_device(&router, 5000).await;

    assert_eq!(
        device_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": false})]
    );
    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "esp32_connected", "connected": true})]
    );
    assert!(router.device_connected().await);
}

#[tokio::test]
async fn test_observer_registration_reports_device_status() {
    let router = Router::default();

    let (_first, first_rx) = register_observer(&router, 5001).await;
    assert_eq!(
        first_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": false, "esp32_connected": false})]
    );

    let (_device, _device_rx) = register_device(&router, 5000).await;

    let (_second, second_rx) = register_observer(&router, 5002).await;
    assert_eq!(
        second_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": false, "esp32_connected": true})]
    );
    assert_eq!(router.observer_count().await, 2);
}

#[tokio::test]
async fn test_observer_reregistration_is_absorbed() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;

    send(&router, &observer, json!({"type": "register", "device": "browser"}))
        .await
        .unwrap();

    assert_eq!(router.observer_count().await, 1);
    assert_eq!(observer_rx.messages_of_type("state").len(), 2);
}

#[tokio::test]
async fn test_last_registered_device_wins() {
    let router = Router::default();
    let (_observer, _observer_rx) = register_observer(&router, 5001).await;

    let (first, first_rx) = register_device(&router, 5000).await;
    let (second, second_rx) = register_device(&router, 5002).await;
    let (third, third_rx) = register_device(&router, 5003).await;
    for rx in [&first_rx, &second_rx, &third_rx] {
        rx.clear();
    }

    let (observer, _) = register_observer(&router, 5004).await;
    led(&router, &observer, "red", "on").await.unwrap();

    assert_eq!(first_rx.count(), 0);
    assert_eq!(second_rx.count(), 0);
    assert_eq!(
        third_rx.messages(),
        vec![json!({"type": "led", "color": "red", "action": "on"})]
    );

    // Displaced devices are not closed by the replacement
    assert!(first.is_connected());
    assert!(second.is_connected());
    assert!(third.is_connected());
}

#[tokio::test]
async fn test_role_cannot_change_after_registration() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;

    let result = send(&router, &observer, json!({"type": "register", "device": "esp32"})).await;
    assert!(matches!(result, Err(RouterError::RoleViolation { .. })));
    assert!(!router.device_connected().await);
    assert!(observer_rx.messages_of_type("esp32_connected").is_empty());
}

#[tokio::test]
async fn test_unknown_device_kind_is_ignored() {
    let router = Router::default();
    let (conn, rx) = connect(&router, 5000);

    send(&router, &conn, json!({"type": "register", "device": "toaster"}))
        .await
        .unwrap();

    assert_eq!(rx.count(), 0);
    assert_eq!(router.observer_count().await, 0);
    assert!(!router.device_connected().await);
}

// ============================================================================
// LED commands
// ============================================================================

#[tokio::test]
async fn test_led_updates_state_forwards_and_broadcasts() {
    let router = Router::default();
    let (_device, device_rx) = register_device(&router, 5000).await;
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    let (_other, other_rx) = register_observer(&router, 5002).await;
    device_rx.clear();
    observer_rx.clear();
    other_rx.clear();

    led(&router, &observer, "red", "on").await.unwrap();

    assert_eq!(router.switches().await, SwitchState { red: true, blue: false });
    assert_eq!(
        device_rx.messages(),
        vec![json!({"type": "led", "color": "red", "action": "on"})]
    );
    let expected = vec![json!({"type": "state", "red": true, "blue": false})];
    assert_eq!(observer_rx.messages(), expected);
    assert_eq!(other_rx.messages(), expected);

    led(&router, &observer, "red", "off").await.unwrap();
    assert_eq!(router.switches().await, SwitchState::default());
    assert_eq!(
        device_rx.last(),
        Some(json!({"type": "led", "color": "red", "action": "off"}))
    );
}

#[tokio::test]
async fn test_led_without_device_still_updates_observers() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    led(&router, &observer, "blue", "on").await.unwrap();

    assert!(router.switches().await.blue);
    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": true})]
    );
}

#[tokio::test]
async fn test_led_from_non_observer_is_ignored() {
    let router = Router::default();
    let (device, device_rx) = register_device(&router, 5000).await;
    let (stranger, _) = connect(&router, 5002);
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    device_rx.clear();
    observer_rx.clear();

    for conn in [&device, &stranger] {
        let result = led(&router, conn, "red", "on").await;
        assert!(matches!(result, Err(RouterError::RoleViolation { message: "led", .. })));
    }

    assert_eq!(router.switches().await, SwitchState::default());
    assert_eq!(device_rx.count(), 0);
    assert_eq!(observer_rx.count(), 0);
}

#[tokio::test]
async fn test_invalid_led_fields_are_dropped() {
    let router = Router::default();
    let (_device, device_rx) = register_device(&router, 5000).await;
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    device_rx.clear();
    observer_rx.clear();

    let result = led(&router, &observer, "green", "on").await;
    assert!(matches!(result, Err(RouterError::UnknownSwitch(ref name)) if name == "green"));

    let result = led(&router, &observer, "red", "toggle").await;
    assert!(matches!(result, Err(RouterError::InvalidAction(ref action)) if action == "toggle"));

    assert_eq!(router.switches().await, SwitchState::default());
    assert_eq!(device_rx.count(), 0);
    assert_eq!(observer_rx.count(), 0);
}

#[tokio::test]
async fn test_late_observer_sees_prior_updates() {
    let router = Router::default();
    let (first, _first_rx) = register_observer(&router, 5001).await;

    led(&router, &first, "red", "on").await.unwrap();
    led(&router, &first, "blue", "on").await.unwrap();
    led(&router, &first, "red", "off").await.unwrap();

    let (_late, late_rx) = register_observer(&router, 5002).await;
    assert_eq!(
        late_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": true, "esp32_connected": false})]
    );
}

#[tokio::test]
async fn test_concurrent_led_commands_are_not_lost() {
    let router = Arc::new(Router::default());
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    let red = {
        let router = Arc::clone(&router);
        let observer = Arc::clone(&observer);
        tokio::spawn(async move { led(&router, &observer, "red", "on").await })
    };
    let blue = {
        let router = Arc::clone(&router);
        let observer = Arc::clone(&observer);
        tokio::spawn(async move { led(&router, &observer, "blue", "on").await })
    };
    red.await.unwrap().unwrap();
    blue.await.unwrap().unwrap();

    assert_eq!(router.switches().await, SwitchState { red: true, blue: true });
    assert_eq!(
        observer_rx.last(),
        Some(json!({"type": "state", "red": true, "blue": true}))
    );
}

// ============================================================================
// Button events
// ============================================================================

#[tokio::test]
async fn test_button_from_device_reaches_observers() {
    let router = Router::default();
    let (device, _device_rx) = register_device(&router, 5000).await;
    let (_a, a_rx) = register_observer(&router, 5001).await;
    let (_b, b_rx) = register_observer(&router, 5002).await;
    a_rx.clear();
    b_rx.clear();

    send(&router, &device, json!({"type": "button"})).await.unwrap();

    let expected = vec![json!({"type": "button", "action": "pressed"})];
    assert_eq!(a_rx.messages(), expected);
    assert_eq!(b_rx.messages(), expected);
}

#[tokio::test]
async fn test_button_with_extra_fields_reaches_observers() {
    let router = Router::default();
    let (device, _device_rx) = register_device(&router, 5000).await;
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    for payload in [
        json!({"type": "button", "action": "press"}),
        json!({"type": "button", "pin": 0, "level": "low"}),
    ] {
        send(&router, &device, payload).await.unwrap();
    }

    let expected = json!({"type": "button", "action": "pressed"});
    assert_eq!(observer_rx.messages(), vec![expected.clone(), expected]);
}

#[tokio::test]
async fn test_button_from_non_device_is_ignored() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    let (stranger, _) = connect(&router, 5002);
    observer_rx.clear();

    for conn in [&observer, &stranger] {
        let result = send(&router, conn, json!({"type": "button"})).await;
        assert!(matches!(result, Err(RouterError::RoleViolation { message: "button", .. })));
    }
    assert_eq!(observer_rx.count(), 0);
}

#[tokio::test]
async fn test_button_from_displaced_device_is_ignored() {
    let router = Router::default();
    let (old, _) = register_device(&router, 5000).await;
    let (_new, _) = register_device(&router, 5002).await;
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    let result = send(&router, &old, json!({"type": "button"})).await;
    assert!(result.is_err());
    assert_eq!(observer_rx.count(), 0);
}

// ============================================================================
// Disconnects
// ============================================================================

#[tokio::test]
async fn test_device_close_notifies_observers() {
    let router = Router::default();
    let (device, device_rx) = register_device(&router, 5000).await;
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    device_rx.disconnect();
    router.handle_close(&device).await;

    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "esp32_connected", "connected": false})]
    );
    assert!(!router.device_connected().await);

    // Forwarding with no device is a silent drop, not an error
    observer_rx.clear();
    led(&router, &observer, "red", "on").await.unwrap();
    assert_eq!(device_rx.count(), 1);
    assert_eq!(observer_rx.messages_of_type("state").len(), 1);
}

#[tokio::test]
async fn test_displaced_device_close_reports_current_status() {
    let router = Router::default();
    let (old, _) = register_device(&router, 5000).await;
    let (new, new_rx) = register_device(&router, 5002).await;
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    router.handle_close(&old).await;

    // The replacement is still up, so observers hear `true`
    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "esp32_connected", "connected": true})]
    );
    assert!(router.device_connected().await);

    // Closing the replacement afterwards reports the device gone
    observer_rx.clear();
    new_rx.disconnect();
    router.handle_close(&new).await;
    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "esp32_connected", "connected": false})]
    );
    assert!(!router.device_connected().await);
}

#[tokio::test]
async fn test_observer_close_removes_only_that_observer() {
    let router = Router::default();
    let (_device, device_rx) = register_device(&router, 5000).await;
    let (leaving, leaving_rx) = register_observer(&router, 5001).await;
    let (staying, staying_rx) = register_observer(&router, 5002).await;
    device_rx.clear();
    staying_rx.clear();

    router.handle_close(&leaving).await;
    assert_eq!(router.observer_count().await, 1);
    assert_eq!(staying_rx.count(), 0);
    assert_eq!(device_rx.count(), 0);

    leaving_rx.clear();
    led(&router, &staying, "blue", "on").await.unwrap();
    assert_eq!(leaving_rx.count(), 0);
    assert_eq!(staying_rx.count(), 1);
}

#[tokio::test]
async fn test_unregistered_close_is_noop() {
    let router = Router::default();
    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    let (stranger, _) = connect(&router, 5002);
    observer_rx.clear();
    assert_eq!(router.connection_count(), 2);

    router.handle_close(&stranger).await;

    assert_eq!(router.connection_count(), 1);
    assert_eq!(router.observer_count().await, 1);
    assert_eq!(observer_rx.count(), 0);
}

#[tokio::test]
async fn test_broadcast_skips_unwritable_observers() {
    let router = Router::default();
    let (device, _) = register_device(&router, 5000).await;
    let (_stale, stale_rx) = register_observer(&router, 5001).await;
    let (_live, live_rx) = register_observer(&router, 5002).await;
    stale_rx.clear();
    live_rx.clear();

    stale_rx.disconnect();
    send(&router, &device, json!({"type": "button"})).await.unwrap();

    assert_eq!(stale_rx.count(), 0);
    assert_eq!(live_rx.count(), 1);
    // Still registered until its own close event
    assert_eq!(router.observer_count().await, 2);
}

#[tokio::test]
async fn test_unwritable_device_counts_as_absent() {
    let router = Router::default();
    let (_device, device_rx) = register_device(&router, 5000).await;
    device_rx.disconnect();

    let (_observer, observer_rx) = register_observer(&router, 5001).await;
    assert_eq!(
        observer_rx.messages(),
        vec![json!({"type": "state", "red": false, "blue": false, "esp32_connected": false})]
    );
}

// ============================================================================
// Malformed input
// ============================================================================

#[tokio::test]
async fn test_malformed_payload_changes_nothing() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    for payload in ["not json", "{\"type\":", "17", ""] {
        let result = router.handle_data(&observer, payload.as_bytes()).await;
        assert!(matches!(result, Err(RouterError::Decode(_))));
    }

    assert_eq!(router.switches().await, SwitchState::default());
    assert_eq!(observer_rx.count(), 0);

    // Still an observer afterwards
    led(&router, &observer, "red", "on").await.unwrap();
    assert!(router.switches().await.red);
}

#[tokio::test]
async fn test_unknown_message_type_is_ignored() {
    let router = Router::default();
    let (observer, observer_rx) = register_observer(&router, 5001).await;
    observer_rx.clear();

    send(&router, &observer, json!({"type": "reboot", "now": true}))
        .await
        .unwrap();
    send(&router, &observer, json!({"type": "state", "red": true, "blue": true}))
        .await
        .unwrap();

    assert_eq!(router.switches().await, SwitchState::default());
    assert_eq!(observer_rx.count(), 0);
}
