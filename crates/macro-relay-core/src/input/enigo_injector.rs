//! Input injection backed by enigo.

use crate::{CoreError, CoreResult, KeyRef, KeyboardInjector, MouseButton, MouseInjector, NamedKey};

use std::panic::Location;

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use error_location::ErrorLocation;
use tracing::{info, instrument};

/// Injects synthetic keyboard and mouse events into the OS input stream.
///
/// `Enigo` is not `Send` on every platform, so an instance is created on the
/// thread that plays the macro and never moved.
pub struct EnigoInjector {
    enigo: Enigo,
}

impl EnigoInjector {
    /// Connect to the platform input backend.
    #[track_caller]
    #[instrument]
    pub fn new() -> CoreResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| CoreError::InjectionFailure {
            reason: format!("Failed to create Enigo: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Input injector initialized");

        Ok(Self { enigo })
    }
}

impl KeyboardInjector for EnigoInjector {
    #[track_caller]
    fn key(&mut self, key: KeyRef, press: bool) -> CoreResult<()> {
        let enigo_key = to_enigo_key(key)?;
        self.enigo
            .key(enigo_key, direction(press))
            .map_err(|e| CoreError::InjectionFailure {
                reason: format!("Failed to {} key {}: {}", verb(press), key, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn text(&mut self, text: &str) -> CoreResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.enigo.text(text).map_err(|e| CoreError::InjectionFailure {
            reason: format!("Failed to type text: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

impl MouseInjector for EnigoInjector {
    #[track_caller]
    fn move_to(&mut self, x: i32, y: i32) -> CoreResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| CoreError::InjectionFailure {
                reason: format!("Failed to move pointer to {}, {}: {}", x, y, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn move_by(&mut self, dx: i32, dy: i32) -> CoreResult<()> {
        self.enigo
            .move_mouse(dx, dy, Coordinate::Rel)
            .map_err(|e| CoreError::InjectionFailure {
                reason: format!("Failed to move pointer by {}, {}: {}", dx, dy, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn button(&mut self, button: MouseButton, press: bool) -> CoreResult<()> {
        let enigo_button = to_enigo_button(button)?;
        self.enigo
            .button(enigo_button, direction(press))
            .map_err(|e| CoreError::InjectionFailure {
                reason: format!("Failed to {} button {}: {}", verb(press), button, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn scroll(&mut self, dx: i32, dy: i32) -> CoreResult<()> {
        // enigo scrolls down for positive vertical lengths
        if dy != 0 {
            self.enigo
                .scroll(-dy, Axis::Vertical)
                .map_err(|e| CoreError::InjectionFailure {
                    reason: format!("Failed to scroll vertically by {}: {}", dy, e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        if dx != 0 {
            self.enigo
                .scroll(dx, Axis::Horizontal)
                .map_err(|e| CoreError::InjectionFailure {
                    reason: format!("Failed to scroll horizontally by {}: {}", dx, e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        Ok(())
    }
}

fn direction(press: bool) -> Direction {
    if press {
        Direction::Press
    } else {
        Direction::Release
    }
}

fn verb(press: bool) -> &'static str {
    if press { "press" } else { "release" }
}

#[track_caller]
fn to_enigo_key(key: KeyRef) -> CoreResult<Key> {
    let named = match key {
        KeyRef::Named(named) => named,
        KeyRef::Code(code) => match NamedKey::from_vk(code) {
            Some(named) => named,
            None => return code_key(key, code),
        },
    };

    let mapped = match named {
        NamedKey::Alt => Key::Alt,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::CapsLock => Key::CapsLock,
        NamedKey::Cmd => Key::Meta,
        NamedKey::Ctrl => Key::Control,
        NamedKey::Delete => Key::Delete,
        NamedKey::Down => Key::DownArrow,
        NamedKey::End => Key::End,
        NamedKey::Enter => Key::Return,
        NamedKey::Esc => Key::Escape,
        NamedKey::F1 => Key::F1,
        NamedKey::F2 => Key::F2,
        NamedKey::F3 => Key::F3,
        NamedKey::F4 => Key::F4,
        NamedKey::F5 => Key::F5,
        NamedKey::F6 => Key::F6,
        NamedKey::F7 => Key::F7,
        NamedKey::F8 => Key::F8,
        NamedKey::F9 => Key::F9,
        NamedKey::F10 => Key::F10,
        NamedKey::F11 => Key::F11,
        NamedKey::F12 => Key::F12,
        NamedKey::F13 => Key::F13,
        NamedKey::F14 => Key::F14,
        NamedKey::F15 => Key::F15,
        NamedKey::F16 => Key::F16,
        NamedKey::F17 => Key::F17,
        NamedKey::F18 => Key::F18,
        NamedKey::F19 => Key::F19,
        NamedKey::F20 => Key::F20,
        NamedKey::Home => Key::Home,
        NamedKey::Left => Key::LeftArrow,
        NamedKey::MediaNext => Key::MediaNextTrack,
        NamedKey::MediaPlayPause => Key::MediaPlayPause,
        NamedKey::MediaPrevious => Key::MediaPrevTrack,
        NamedKey::MediaVolumeDown => Key::VolumeDown,
        NamedKey::MediaVolumeMute => Key::VolumeMute,
        NamedKey::MediaVolumeUp => Key::VolumeUp,
        NamedKey::PageDown => Key::PageDown,
        NamedKey::PageUp => Key::PageUp,
        NamedKey::Right => Key::RightArrow,
        NamedKey::Shift => Key::Shift,
        NamedKey::Space => Key::Space,
        NamedKey::Tab => Key::Tab,
        NamedKey::Up => Key::UpArrow,
        #[cfg(not(target_os = "macos"))]
        NamedKey::Insert => Key::Insert,
        #[cfg(not(target_os = "macos"))]
        NamedKey::NumLock => Key::Numlock,
        #[cfg(not(target_os = "macos"))]
        NamedKey::Pause => Key::Pause,
        #[cfg(not(target_os = "macos"))]
        NamedKey::PrintScreen => Key::PrintScr,
        #[cfg(target_os = "windows")]
        NamedKey::ScrollLock => Key::Scroll,
        #[cfg(all(unix, not(target_os = "macos")))]
        NamedKey::ScrollLock => Key::ScrollLock,
        #[cfg(target_os = "windows")]
        NamedKey::Menu => Key::Apps,
        #[cfg(all(unix, not(target_os = "macos")))]
        NamedKey::Menu => Key::LMenu,
        #[cfg(target_os = "macos")]
        NamedKey::Insert
        | NamedKey::NumLock
        | NamedKey::Pause
        | NamedKey::PrintScreen
        | NamedKey::ScrollLock
        | NamedKey::Menu => return Err(unsupported_key(key)),
    };

    Ok(mapped)
}

/// Keys given by a virtual-key code with no symbolic name.
#[track_caller]
fn code_key(key: KeyRef, code: u32) -> CoreResult<Key> {
    if let Some(c) = key.typed_char() {
        return Ok(Key::Unicode(c));
    }

    #[cfg(target_os = "windows")]
    {
        Ok(Key::Other(code))
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = code;
        Err(unsupported_key(key))
    }
}

#[track_caller]
fn unsupported_key(key: KeyRef) -> CoreError {
    CoreError::InjectionFailure {
        reason: format!("Key {} is not supported on this platform", key),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn to_enigo_button(button: MouseButton) -> CoreResult<Button> {
    match button {
        MouseButton::Left => Ok(Button::Left),
        MouseButton::Right => Ok(Button::Right),
        MouseButton::Middle => Ok(Button::Middle),
        #[cfg(not(target_os = "macos"))]
        MouseButton::X1 => Ok(Button::Back),
        #[cfg(not(target_os = "macos"))]
        MouseButton::X2 => Ok(Button::Forward),
        #[cfg(target_os = "macos")]
        MouseButton::X1 | MouseButton::X2 => Err(CoreError::InjectionFailure {
            reason: format!("Button {} is not supported on this platform", button),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
