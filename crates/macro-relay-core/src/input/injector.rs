use crate::{CoreResult, KeyRef, MouseButton};

/// Keyboard half of the injection capability.
pub trait KeyboardInjector {
    /// Press (`press = true`) or release a key.
    fn key(&mut self, key: KeyRef, press: bool) -> CoreResult<()>;

    /// Type a string.
    fn text(&mut self, text: &str) -> CoreResult<()>;
}

/// Mouse half of the injection capability.
pub trait MouseInjector {
    /// Move the pointer to absolute screen coordinates.
    fn move_to(&mut self, x: i32, y: i32) -> CoreResult<()>;

    /// Move the pointer by an offset.
    fn move_by(&mut self, dx: i32, dy: i32) -> CoreResult<()>;

    /// Press or release a button at the current pointer position.
    fn button(&mut self, button: MouseButton, press: bool) -> CoreResult<()>;

    /// Scroll the wheel. Positive `dy` scrolls up, positive `dx` right.
    fn scroll(&mut self, dx: i32, dy: i32) -> CoreResult<()>;
}

/// Full input injection capability used to play back commands.
pub trait InputInjector: KeyboardInjector + MouseInjector {}

impl<T: KeyboardInjector + MouseInjector> InputInjector for T {}
