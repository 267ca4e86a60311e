//! Persisted form of a [`Command`].
//!
//! Every record carries `name`, `type` and `time`, followed by the fields of
//! its variant. `name` is informational only: it is rewritten on encode and
//! ignored on decode.

use crate::{Command, CommandKind, CoreError, CoreResult, KeyRef, MouseButton, NamedKey};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted `type` tags understood by this version.
pub const KNOWN_KINDS: [&str; 6] = ["key", "click", "move", "scroll", "delay", "textinput"];

/// Serializable command record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Display name at the time of writing.
    #[serde(default)]
    pub name: String,
    /// Schedule offset in seconds.
    #[serde(default)]
    pub time: f64,
    /// Variant fields, tagged by `type`.
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Variant-specific part of a [`CommandRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordBody {
    /// Key press or release.
    #[serde(rename = "key")]
    Key {
        /// `"key"` for a symbolic name, `"keycode"` for a raw code.
        keytype: String,
        /// Key name or code, depending on `keytype`.
        value: KeyValue,
        /// Press flag.
        press: bool,
    },
    /// Mouse button press or release.
    #[serde(rename = "click")]
    Click {
        /// Raw button tuple, see [`MouseButton::to_raw`].
        button: [u32; 3],
        /// Press flag.
        press: bool,
        /// Horizontal coordinate or offset.
        x: i32,
        /// Vertical coordinate or offset.
        y: i32,
        /// Positioning mode.
        absolute: bool,
    },
    /// Pointer move.
    #[serde(rename = "move")]
    Move {
        /// Horizontal coordinate or offset.
        x: i32,
        /// Vertical coordinate or offset.
        y: i32,
        /// Positioning mode.
        absolute: bool,
    },
    /// Wheel scroll; `x`/`y` hold the deltas.
    #[serde(rename = "scroll")]
    Scroll {
        /// Horizontal delta.
        x: i32,
        /// Vertical delta.
        y: i32,
    },
    /// Fixed pause.
    #[serde(rename = "delay")]
    Delay {
        /// Seconds to wait.
        delay: f64,
    },
    /// Typed text.
    #[serde(rename = "textinput")]
    TextInput {
        /// Text to type.
        text: String,
    },
}

/// Key value: a raw code or a symbolic name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Raw key code.
    Code(u32),
    /// Symbolic key name.
    Name(String),
}

impl Command {
    /// Encode into the persisted record form.
    pub fn to_record(&self) -> CommandRecord {
        let body = match &self.kind {
            CommandKind::Key { key, press } => {
                let (keytype, value) = match key {
                    KeyRef::Named(named) => ("key", KeyValue::Name(named.as_str().to_string())),
                    KeyRef::Code(code) => ("keycode", KeyValue::Code(*code)),
                };
                RecordBody::Key {
                    keytype: keytype.to_string(),
                    value,
                    press: *press,
                }
            }
            CommandKind::MouseClick {
                button,
                press,
                x,
                y,
                absolute,
            } => RecordBody::Click {
                button: button.to_raw(),
                press: *press,
                x: *x,
                y: *y,
                absolute: *absolute,
            },
            CommandKind::MouseMove { x, y, absolute } => RecordBody::Move {
                x: *x,
                y: *y,
                absolute: *absolute,
            },
            CommandKind::MouseScroll { dx, dy } => RecordBody::Scroll { x: *dx, y: *dy },
            CommandKind::Delay { seconds } => RecordBody::Delay { delay: *seconds },
            CommandKind::Text { text } => RecordBody::TextInput { text: text.clone() },
        };

        CommandRecord {
            name: self.render_name(),
            time: self.time,
            body,
        }
    }

    /// Decode a typed record.
    #[track_caller]
    pub fn from_record(record: CommandRecord) -> CoreResult<Self> {
        let time = record.time;
        let command = match record.body {
            RecordBody::Key {
                keytype,
                value,
                press,
            } => Command::key(decode_key(&keytype, value)?, press, time),
            RecordBody::Click {
                button,
                press,
                x,
                y,
                absolute,
            } => {
                let button = MouseButton::from_raw(button).ok_or_else(|| CoreError::Malformed {
                    reason: format!("Unknown mouse button encoding: {:?}", button),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                Command::click(button, press, x, y, absolute, time)
            }
            RecordBody::Move { x, y, absolute } => Command::mouse_move(x, y, absolute, time),
            RecordBody::Scroll { x, y } => Command::scroll(x, y, time),
            RecordBody::Delay { delay } => Command::delay(delay, time),
            RecordBody::TextInput { text } => Command::text(text, time),
        };
        Ok(command)
    }

    /// Decode an untyped JSON record, distinguishing unknown kinds from
    /// malformed known ones.
    #[track_caller]
    pub fn from_json(value: Value) -> CoreResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::Malformed {
                reason: "Command record has no type tag".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Err(CoreError::UnknownCommandKind {
                kind,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let record: CommandRecord =
            serde_json::from_value(value).map_err(|e| CoreError::Malformed {
                reason: format!("Invalid {} record: {}", kind, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Self::from_record(record)
    }
}

#[track_caller]
fn decode_key(keytype: &str, value: KeyValue) -> CoreResult<KeyRef> {
    match (keytype, value) {
        ("keycode", KeyValue::Code(code)) => Ok(KeyRef::Code(code)),
        ("key", KeyValue::Name(name)) => {
            NamedKey::parse(&name)
                .map(KeyRef::Named)
                .ok_or_else(|| CoreError::Malformed {
                    reason: format!("Unknown key name: {}", name),
                    location: ErrorLocation::from(Location::caller()),
                })
        }
        (other, value) => Err(CoreError::Malformed {
            reason: format!("Key type {} does not match value {:?}", other, value),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
