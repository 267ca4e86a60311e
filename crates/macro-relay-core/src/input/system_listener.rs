//! OS-level input capture feeding a process-wide [`InputHub`].
//!
//! `rdev::listen` blocks forever and can only be installed once per process,
//! so a single listener thread is started lazily and every recorder shares
//! the hub it feeds.

use crate::{InputHub, KeyRef, MouseButton, NamedKey, RawInputEvent};

use std::sync::{Arc, OnceLock};

use rdev::{Button, Event, EventType, Key};
use tracing::{error, info};

static SYSTEM_HUB: OnceLock<Arc<InputHub>> = OnceLock::new();

/// The hub fed by the OS input listener, starting the listener on first use.
pub fn system_hub() -> Arc<InputHub> {
    Arc::clone(SYSTEM_HUB.get_or_init(|| {
        let hub = Arc::new(InputHub::new());
        install_system_listener(Arc::clone(&hub));
        hub
    }))
}

fn install_system_listener(hub: Arc<InputHub>) {
    let spawned = std::thread::Builder::new()
        .name("input-listener".to_string())
        .spawn(move || {
            info!("System input listener started");
            let result = rdev::listen(move |event: Event| {
                if let Some(raw) = convert(&event.event_type, &hub) {
                    hub.publish(raw);
                }
            });
            if let Err(e) = result {
                error!(error = ?e, "System input listener failed");
            }
        });

    if let Err(e) = spawned {
        error!(error = ?e, "Failed to spawn system input listener thread");
    }
}

fn convert(event_type: &EventType, hub: &InputHub) -> Option<RawInputEvent> {
    match event_type {
        EventType::KeyPress(key) => Some(RawInputEvent::KeyPress(key_ref(key)?)),
        EventType::KeyRelease(key) => Some(RawInputEvent::KeyRelease(key_ref(key)?)),
        EventType::MouseMove { x, y } => Some(RawInputEvent::MouseMove {
            x: x.round() as i32,
            y: y.round() as i32,
        }),
        EventType::ButtonPress(button) | EventType::ButtonRelease(button) => {
            let press = matches!(event_type, EventType::ButtonPress(_));
            let (x, y) = hub.pointer_position();
            Some(RawInputEvent::MouseButton {
                button: mouse_button(button)?,
                press,
                x,
                y,
            })
        }
        EventType::Wheel { delta_x, delta_y } => Some(RawInputEvent::MouseScroll {
            dx: clamp_delta(*delta_x),
            dy: clamp_delta(*delta_y),
        }),
    }
}

fn clamp_delta(delta: i64) -> i32 {
    delta.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn mouse_button(button: &Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(1) => Some(MouseButton::X1),
        Button::Unknown(2) => Some(MouseButton::X2),
        Button::Unknown(_) => None,
    }
}

fn key_ref(key: &Key) -> Option<KeyRef> {
    let named = match key {
        Key::Alt | Key::AltGr => NamedKey::Alt,
        Key::Backspace => NamedKey::Backspace,
        Key::CapsLock => NamedKey::CapsLock,
        Key::MetaLeft | Key::MetaRight => NamedKey::Cmd,
        Key::ControlLeft | Key::ControlRight => NamedKey::Ctrl,
        Key::Delete => NamedKey::Delete,
        Key::DownArrow => NamedKey::Down,
        Key::End => NamedKey::End,
        Key::Return | Key::KpReturn => NamedKey::Enter,
        Key::Escape => NamedKey::Esc,
        Key::F1 => NamedKey::F1,
        Key::F2 => NamedKey::F2,
        Key::F3 => NamedKey::F3,
        Key::F4 => NamedKey::F4,
        Key::F5 => NamedKey::F5,
        Key::F6 => NamedKey::F6,
        Key::F7 => NamedKey::F7,
        Key::F8 => NamedKey::F8,
        Key::F9 => NamedKey::F9,
        Key::F10 => NamedKey::F10,
        Key::F11 => NamedKey::F11,
        Key::F12 => NamedKey::F12,
        Key::Home => NamedKey::Home,
        Key::Insert => NamedKey::Insert,
        Key::NumLock => NamedKey::NumLock,
        Key::Pause => NamedKey::Pause,
        Key::PrintScreen => NamedKey::PrintScreen,
        Key::ScrollLock => NamedKey::ScrollLock,
        Key::LeftArrow => NamedKey::Left,
        Key::PageDown => NamedKey::PageDown,
        Key::PageUp => NamedKey::PageUp,
        Key::RightArrow => NamedKey::Right,
        Key::ShiftLeft | Key::ShiftRight => NamedKey::Shift,
        Key::Space => NamedKey::Space,
        Key::Tab => NamedKey::Tab,
        Key::UpArrow => NamedKey::Up,
        other => {
            return keypad_code(other)
                .or_else(|| printable(other).and_then(KeyRef::for_char))
                .or_else(|| unknown_code(other));
        }
    };
    Some(KeyRef::Named(named))
}

/// Keypad keys keep their own virtual-key codes.
fn keypad_code(key: &Key) -> Option<KeyRef> {
    let code = match key {
        Key::Kp0 => 0x60,
        Key::Kp1 => 0x61,
        Key::Kp2 => 0x62,
        Key::Kp3 => 0x63,
        Key::Kp4 => 0x64,
        Key::Kp5 => 0x65,
        Key::Kp6 => 0x66,
        Key::Kp7 => 0x67,
        Key::Kp8 => 0x68,
        Key::Kp9 => 0x69,
        Key::KpMultiply => 0x6A,
        Key::KpPlus => 0x6B,
        Key::KpMinus => 0x6D,
        Key::KpDelete => 0x6E,
        Key::KpDivide => 0x6F,
        _ => return None,
    };
    Some(KeyRef::Code(code))
}

fn unknown_code(key: &Key) -> Option<KeyRef> {
    match key {
        Key::Unknown(code) => Some(KeyRef::Code(*code)),
        _ => None,
    }
}

fn printable(key: &Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        Key::BackQuote => '`',
        Key::Minus => '-',
        Key::Equal => '=',
        Key::Slash => '/',
        Key::LeftBracket => '[',
        Key::RightBracket => ']',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::BackSlash | Key::IntlBackslash => '\\',
        Key::Comma => ',',
        Key::Dot => '.',
        _ => return None,
    };
    Some(c)
}
