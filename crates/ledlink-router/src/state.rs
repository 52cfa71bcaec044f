//! Switch state store

use ledlink_core::{StateMessage, Switch, SwitchState};

use crate::error::Result;

/// Holds the current value of every switch.
///
/// Starts all-off and is never persisted.
#[derive(Debug, Default)]
pub struct SwitchStore {
    switches: SwitchState,
}

impl SwitchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values
    pub fn get(&self) -> SwitchState {
        self.switches
    }

    /// Set a switch by wire name, returning its previous value
    pub fn set(&mut self, name: &str, on: bool) -> Result<bool> {
        let switch = name.parse::<Switch>()?;
        Ok(self.set_switch(switch, on))
    }

    pub fn set_switch(&mut self, switch: Switch, on: bool) -> bool {
        self.switches.set(switch, on)
    }

    /// A `state` message carrying the current values
    pub fn snapshot(&self) -> StateMessage {
        StateMessage::from(self.switches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouterError;

    #[test]
    fn test_starts_all_off() {
        let store = SwitchStore::new();
        assert_eq!(store.get(), SwitchState { red: false, blue: false });
    }

    #[test]
    fn test_set_by_name() {
        let mut store = SwitchStore::new();
        assert!(!store.set("blue", true).unwrap());
        assert!(store.get().blue);
        assert!(store.set("blue", true).unwrap());
        assert!(!store.get().red);
    }

    #[test]
    fn test_unknown_switch_leaves_state_alone() {
        let mut store = SwitchStore::new();
        let err = store.set("green", true).unwrap_err();
        assert!(matches!(err, RouterError::UnknownSwitch(name) if name == "green"));
        assert_eq!(store.get(), SwitchState::default());
    }

    #[test]
    fn test_snapshot_has_no_device_status() {
        let mut store = SwitchStore::new();
        store.set_switch(Switch::Red, true);
        let snapshot = store.snapshot();
        assert!(snapshot.red);
        assert!(!snapshot.blue);
        assert_eq!(snapshot.esp32_connected, None);
    }
}
