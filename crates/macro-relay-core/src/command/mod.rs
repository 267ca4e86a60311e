mod button;
#[allow(clippy::module_inception)]
mod command;
mod key;
mod record;

pub use {
    button::MouseButton,
    command::{Command, CommandKind, CommandUpdate},
    key::{KeyRef, NamedKey},
    record::{CommandRecord, KNOWN_KINDS, KeyValue, RecordBody},
};
