use crate::{KeyRef, NamedKey};

/// What the recorder captures and how it timestamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderOptions {
    /// Capture pointer moves.
    pub record_mouse_move: bool,
    /// Capture mouse button presses and releases.
    pub record_mouse_click: bool,
    /// Capture wheel scrolls.
    pub record_mouse_scroll: bool,
    /// Capture key presses and releases.
    pub record_keyboard: bool,
    /// Emit pointer positions relative to where the pointer was at start.
    pub mouse_position_relative: bool,
    /// Attach elapsed time to commands; otherwise every command gets 0.
    pub record_time: bool,
    /// Seconds added to every computed timestamp.
    pub time_offset: f64,
    /// Minimum seconds between two recorded pointer moves.
    pub move_timeout: f64,
    /// Key that ends the recording instead of being recorded.
    pub stop_key: KeyRef,
}

impl RecorderOptions {
    /// Whether any mouse channel is enabled.
    pub fn records_mouse(&self) -> bool {
        self.record_mouse_move || self.record_mouse_click || self.record_mouse_scroll
    }
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            record_mouse_move: true,
            record_mouse_click: true,
            record_mouse_scroll: true,
            record_keyboard: true,
            mouse_position_relative: false,
            record_time: true,
            time_offset: 0.0,
            move_timeout: 0.05,
            stop_key: KeyRef::Named(NamedKey::Esc),
        }
    }
}
