//! Protocol types and message definitions
//!
//! Every message is a JSON object whose `type` field selects the variant:
//!
//! | type | direction |
//! |---|---|
//! | `register` | client → relay |
//! | `state` | relay → client |
//! | `esp32_connected` | relay → observers |
//! | `led` | observer → relay → device |
//! | `button` | device → relay → observers |

use crate::switch::{LedAction, Switch, SwitchState};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Which side of the relay a client claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// The embedded controller
    Esp32,
    /// An observer UI
    Browser,
    /// Anything else; ignored by the relay
    #[serde(other)]
    Other,
}

/// Protocol message enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "register")]
    Register(RegisterMessage),

    #[serde(rename = "state")]
    State(StateMessage),

    #[serde(rename = "esp32_connected")]
    Esp32Connected(ConnectionStatusMessage),

    #[serde(rename = "led")]
    Led(LedMessage),

    #[serde(rename = "button")]
    Button(ButtonMessage),

    /// Any `type` the relay does not know about
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Wire name of this message's `type`
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Register(_) => "register",
            Message::State(_) => "state",
            Message::Esp32Connected(_) => "esp32_connected",
            Message::Led(_) => "led",
            Message::Button(_) => "button",
            Message::Unknown => "unknown",
        }
    }

    pub fn register(device: DeviceKind) -> Self {
        Message::Register(RegisterMessage { device })
    }

    pub fn esp32_connected(connected: bool) -> Self {
        Message::Esp32Connected(ConnectionStatusMessage { connected })
    }

    pub fn led(color: Switch, action: LedAction) -> Self {
        Message::Led(LedMessage::new(color, action))
    }

    pub fn button_pressed() -> Self {
        Message::Button(ButtonMessage {
            action: Some(ButtonAction::Pressed),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterMessage {
    pub device: DeviceKind,
}

/// Snapshot of every switch.
///
/// `esp32_connected` is only present in the reply to an observer's
/// registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub red: bool,
    pub blue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esp32_connected: Option<bool>,
}

impl StateMessage {
    pub fn with_device_status(mut self, connected: bool) -> Self {
        self.esp32_connected = Some(connected);
        self
    }
}

impl From<SwitchState> for StateMessage {
    fn from(state: SwitchState) -> Self {
        Self {
            red: state.red,
            blue: state.blue,
            esp32_connected: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatusMessage {
    pub connected: bool,
}

/// LED command.
///
/// Fields stay as raw strings so that an unknown color or action can be
/// told apart from a payload that is not a message at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedMessage {
    pub color: String,
    pub action: String,
}

impl LedMessage {
    pub fn new(color: Switch, action: LedAction) -> Self {
        Self {
            color: color.as_str().to_string(),
            action: action.as_str().to_string(),
        }
    }

    /// Validate `color` and `action` against the fixed sets
    pub fn parse(&self) -> Result<(Switch, LedAction)> {
        let color = self.color.parse::<Switch>()?;
        let action = self.action.parse::<LedAction>()?;
        Ok((color, action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    Pressed,
}

/// Button event. Whatever the device sends besides `type` is ignored; the
/// relay adds `action: "pressed"` when fanning it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonMessage {
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub action: Option<ButtonAction>,
}
