//! The fixed switch set and its in-memory state

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the LEDs on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    Red,
    Blue,
}

impl Switch {
    /// Every switch, in wire order
    pub const ALL: [Switch; 2] = [Switch::Red, Switch::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Switch::Red => "red",
            Switch::Blue => "blue",
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Switch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "red" => Ok(Switch::Red),
            "blue" => Ok(Switch::Blue),
            other => Err(Error::UnknownSwitch(other.to_string())),
        }
    }
}

/// Requested LED action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedAction {
    On,
    Off,
}

impl LedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedAction::On => "on",
            LedAction::Off => "off",
        }
    }

    /// Switch value this action produces
    pub fn is_on(&self) -> bool {
        matches!(self, LedAction::On)
    }
}

impl From<bool> for LedAction {
    fn from(on: bool) -> Self {
        if on {
            LedAction::On
        } else {
            LedAction::Off
        }
    }
}

impl fmt::Display for LedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(LedAction::On),
            "off" => Ok(LedAction::Off),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

/// Current value of every switch. All off at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchState {
    pub red: bool,
    pub blue: bool,
}

impl SwitchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, switch: Switch) -> bool {
        match switch {
            Switch::Red => self.red,
            Switch::Blue => self.blue,
        }
    }

    /// Set a switch, returning its previous value
    pub fn set(&mut self, switch: Switch, on: bool) -> bool {
        let slot = match switch {
            Switch::Red => &mut self.red,
            Switch::Blue => &mut self.blue,
        };
        std::mem::replace(slot, on)
    }
}
