//! Wire protocol: newline-terminated JSON objects `{"type", "data"}`.

use crate::{AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use macro_relay_core::MacroSummary;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One protocol message in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Message {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) data: Value,
}

impl Message {
    pub(crate) fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Decode one line. Anything that is not a `{type, data}` object fails.
    #[track_caller]
    pub(crate) fn decode(line: &str) -> AppResult<Self> {
        serde_json::from_str(line).map_err(|e| AppError::Protocol {
            reason: format!("Undecodable message: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Encode as one line, newline included.
    #[track_caller]
    pub(crate) fn encode(&self) -> AppResult<String> {
        let mut line = serde_json::to_string(self).map_err(|e| AppError::Protocol {
            reason: format!("Failed to encode {} message: {}", self.kind, e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        line.push('\n');
        Ok(line)
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClientRequest {
    Heartbeat,
    RequestMacros,
    RequestMacrosUpdate,
    ExecuteMacro { macro_id: String },
    StopMacro,
    SetLayout { layout: Value },
    Unknown { kind: String },
}

impl From<Message> for ClientRequest {
    fn from(message: Message) -> Self {
        match message.kind.as_str() {
            "heartbeat" => ClientRequest::Heartbeat,
            "request-macros" => ClientRequest::RequestMacros,
            "request-macros-update" => ClientRequest::RequestMacrosUpdate,
            "execute-macro" => ClientRequest::ExecuteMacro {
                macro_id: match message.data {
                    Value::String(id) => id,
                    other => other.to_string(),
                },
            },
            "stop-macro" => ClientRequest::StopMacro,
            "set-layout" => ClientRequest::SetLayout {
                layout: message.data,
            },
            _ => ClientRequest::Unknown { kind: message.kind },
        }
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ServerMessage {
    HelloAccept,
    HelloReject,
    Pong,
    MacroList(Vec<MacroSummary>),
    UpdateMacroList(Vec<MacroSummary>),
    MacroStarted(String),
    MacroAlreadyRunning(String),
    MacroStopped(String),
    MacroEnded(String),
    Error(String),
}

impl ServerMessage {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ServerMessage::HelloAccept | ServerMessage::HelloReject => "hello",
            ServerMessage::Pong => "heartbeat",
            ServerMessage::MacroList(_) => "macro-list",
            ServerMessage::UpdateMacroList(_) => "update-macro-list",
            ServerMessage::MacroStarted(_) => "macro-started",
            ServerMessage::MacroAlreadyRunning(_) => "macro-already-running",
            ServerMessage::MacroStopped(_) => "macro-stopped",
            ServerMessage::MacroEnded(_) => "macro-ended",
            ServerMessage::Error(_) => "error",
        }
    }

    fn data(&self) -> Value {
        match self {
            ServerMessage::HelloAccept => json!("accept"),
            ServerMessage::HelloReject => json!("reject"),
            ServerMessage::Pong => json!("pong"),
            ServerMessage::MacroList(list) | ServerMessage::UpdateMacroList(list) => {
                json!({ "macro_list": list })
            }
            ServerMessage::MacroStarted(id)
            | ServerMessage::MacroAlreadyRunning(id)
            | ServerMessage::MacroStopped(id)
            | ServerMessage::MacroEnded(id)
            | ServerMessage::Error(id) => json!(id),
        }
    }

    pub(crate) fn to_message(&self) -> Message {
        Message::new(self.kind(), self.data())
    }

    #[track_caller]
    pub(crate) fn encode(&self) -> AppResult<String> {
        self.to_message().encode()
    }
}

/// One `{macro_id, position}` entry of a set-layout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayoutEntry {
    pub(crate) macro_id: String,
    pub(crate) position: i64,
}

/// Parse a set-layout payload: a JSON array, or a string holding one.
///
/// Any entry without both fields invalidates the whole batch.
#[track_caller]
pub(crate) fn parse_layout(data: &Value) -> AppResult<Vec<LayoutEntry>> {
    let parsed;
    let layout = match data {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).map_err(|e| AppError::Protocol {
                reason: format!("Layout is not JSON: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
            &parsed
        }
        other => other,
    };

    let entries = layout.as_array().ok_or_else(|| AppError::Protocol {
        reason: "Layout is not a list".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    entries
        .iter()
        .map(|entry| {
            let macro_id = entry.get("macro_id").and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            });
            let position = entry.get("position").and_then(Value::as_i64);

            match (macro_id, position) {
                (Some(macro_id), Some(position)) => Ok(LayoutEntry { macro_id, position }),
                _ => Err(AppError::Protocol {
                    reason: format!("Layout entry missing macro_id or position: {}", entry),
                    location: ErrorLocation::from(Location::caller()),
                }),
            }
        })
        .collect()
}
