use crate::Command;

use serde::{Deserialize, Serialize};

/// A named, repeatable sequence of commands plus playback options.
///
/// The id is derived from the name and doubles as the persistence key.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub(crate) id: String,
    name: String,
    /// Free-form description shown to clients.
    pub description: String,
    /// Commands in playback order.
    pub commands: Vec<Command>,
    repeat: u32,
    /// Layout order, owned by whoever arranges macros on screen.
    pub position: i64,
    /// Whether command `time` offsets are honored during playback.
    pub timing: bool,
}

impl Macro {
    /// Create a macro. `repeat` is clamped to at least 1.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        commands: Vec<Command>,
        repeat: u32,
        position: i64,
        timing: bool,
    ) -> Self {
        let name = name.into();
        Self {
            id: macro_id_from_name(&name),
            name,
            description: description.into(),
            commands,
            repeat: repeat.max(1),
            position,
            timing,
        }
    }

    /// Persistence key derived from the name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the macro, re-deriving its id.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.id = macro_id_from_name(&self.name);
    }

    /// Number of times the command sequence is played.
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    /// Set the repeat count, clamped to at least 1.
    pub fn set_repeat(&mut self, repeat: u32) {
        self.repeat = repeat.max(1);
    }

    /// Metadata view used by listings and the wire protocol.
    pub fn summary(&self) -> MacroSummary {
        MacroSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            position: self.position,
            repeat: self.repeat,
            macro_id: self.id.clone(),
            timing: self.timing,
        }
    }
}

/// Macro metadata without its commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSummary {
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Layout order.
    pub position: i64,
    /// Repeat count.
    pub repeat: u32,
    /// Persistence key.
    pub macro_id: String,
    /// Timing flag.
    pub timing: bool,
}

/// Derive a filesystem-safe id from a macro name.
///
/// Reserved path characters and spaces become `_`; anything else that is
/// not alphanumeric is dropped.
pub fn macro_id_from_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
