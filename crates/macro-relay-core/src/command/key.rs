use std::fmt;

/// Keys addressed by a stable symbolic name.
///
/// Names are lowercase and survive persistence unchanged. Side-specific
/// aliases (`ctrl_l`, `shift_r`, ...) are accepted on parse and fold into
/// the generic key.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Alt,
    Backspace,
    CapsLock,
    /// Command / Windows / Super.
    Cmd,
    Ctrl,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    Home,
    Insert,
    Left,
    MediaNext,
    MediaPlayPause,
    MediaPrevious,
    MediaVolumeDown,
    MediaVolumeMute,
    MediaVolumeUp,
    /// Context menu key.
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    Space,
    Tab,
    Up,
}

impl NamedKey {
    /// Every named key.
    pub const ALL: [NamedKey; 51] = [
        NamedKey::Alt,
        NamedKey::Backspace,
        NamedKey::CapsLock,
        NamedKey::Cmd,
        NamedKey::Ctrl,
        NamedKey::Delete,
        NamedKey::Down,
        NamedKey::End,
        NamedKey::Enter,
        NamedKey::Esc,
        NamedKey::F1,
        NamedKey::F2,
        NamedKey::F3,
        NamedKey::F4,
        NamedKey::F5,
        NamedKey::F6,
        NamedKey::F7,
        NamedKey::F8,
        NamedKey::F9,
        NamedKey::F10,
        NamedKey::F11,
        NamedKey::F12,
        NamedKey::F13,
        NamedKey::F14,
        NamedKey::F15,
        NamedKey::F16,
        NamedKey::F17,
        NamedKey::F18,
        NamedKey::F19,
        NamedKey::F20,
        NamedKey::Home,
        NamedKey::Insert,
        NamedKey::Left,
        NamedKey::MediaNext,
        NamedKey::MediaPlayPause,
        NamedKey::MediaPrevious,
        NamedKey::MediaVolumeDown,
        NamedKey::MediaVolumeMute,
        NamedKey::MediaVolumeUp,
        NamedKey::Menu,
        NamedKey::NumLock,
        NamedKey::PageDown,
        NamedKey::PageUp,
        NamedKey::Pause,
        NamedKey::PrintScreen,
        NamedKey::Right,
        NamedKey::ScrollLock,
        NamedKey::Shift,
        NamedKey::Space,
        NamedKey::Tab,
        NamedKey::Up,
    ];

    /// Stable name used for display and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedKey::Alt => "alt",
            NamedKey::Backspace => "backspace",
            NamedKey::CapsLock => "caps_lock",
            NamedKey::Cmd => "cmd",
            NamedKey::Ctrl => "ctrl",
            NamedKey::Delete => "delete",
            NamedKey::Down => "down",
            NamedKey::End => "end",
            NamedKey::Enter => "enter",
            NamedKey::Esc => "esc",
            NamedKey::F1 => "f1",
            NamedKey::F2 => "f2",
            NamedKey::F3 => "f3",
            NamedKey::F4 => "f4",
            NamedKey::F5 => "f5",
            NamedKey::F6 => "f6",
            NamedKey::F7 => "f7",
            NamedKey::F8 => "f8",
            NamedKey::F9 => "f9",
            NamedKey::F10 => "f10",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
            NamedKey::F13 => "f13",
            NamedKey::F14 => "f14",
            NamedKey::F15 => "f15",
            NamedKey::F16 => "f16",
            NamedKey::F17 => "f17",
            NamedKey::F18 => "f18",
            NamedKey::F19 => "f19",
            NamedKey::F20 => "f20",
            NamedKey::Home => "home",
            NamedKey::Insert => "insert",
            NamedKey::Left => "left",
            NamedKey::MediaNext => "media_next",
            NamedKey::MediaPlayPause => "media_play_pause",
            NamedKey::MediaPrevious => "media_previous",
            NamedKey::MediaVolumeDown => "media_volume_down",
            NamedKey::MediaVolumeMute => "media_volume_mute",
            NamedKey::MediaVolumeUp => "media_volume_up",
            NamedKey::Menu => "menu",
            NamedKey::NumLock => "num_lock",
            NamedKey::PageDown => "page_down",
            NamedKey::PageUp => "page_up",
            NamedKey::Pause => "pause",
            NamedKey::PrintScreen => "print_screen",
            NamedKey::Right => "right",
            NamedKey::ScrollLock => "scroll_lock",
            NamedKey::Shift => "shift",
            NamedKey::Space => "space",
            NamedKey::Tab => "tab",
            NamedKey::Up => "up",
        }
    }

    /// Parse a symbolic key name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "alt_l" | "alt_r" | "alt_gr" => Some(NamedKey::Alt),
            "cmd_l" | "cmd_r" => Some(NamedKey::Cmd),
            "ctrl_l" | "ctrl_r" => Some(NamedKey::Ctrl),
            "shift_l" | "shift_r" => Some(NamedKey::Shift),
            other => NamedKey::ALL.into_iter().find(|key| key.as_str() == other),
        }
    }

    /// Windows virtual-key code of this key.
    pub fn vk(&self) -> u32 {
        match self {
            NamedKey::Alt => 0x12,
            NamedKey::Backspace => 0x08,
            NamedKey::CapsLock => 0x14,
            NamedKey::Cmd => 0x5B,
            NamedKey::Ctrl => 0x11,
            NamedKey::Delete => 0x2E,
            NamedKey::Down => 0x28,
            NamedKey::End => 0x23,
            NamedKey::Enter => 0x0D,
            NamedKey::Esc => 0x1B,
            NamedKey::F1 => 0x70,
            NamedKey::F2 => 0x71,
            NamedKey::F3 => 0x72,
            NamedKey::F4 => 0x73,
            NamedKey::F5 => 0x74,
            NamedKey::F6 => 0x75,
            NamedKey::F7 => 0x76,
            NamedKey::F8 => 0x77,
            NamedKey::F9 => 0x78,
            NamedKey::F10 => 0x79,
            NamedKey::F11 => 0x7A,
            NamedKey::F12 => 0x7B,
            NamedKey::F13 => 0x7C,
            NamedKey::F14 => 0x7D,
            NamedKey::F15 => 0x7E,
            NamedKey::F16 => 0x7F,
            NamedKey::F17 => 0x80,
            NamedKey::F18 => 0x81,
            NamedKey::F19 => 0x82,
            NamedKey::F20 => 0x83,
            NamedKey::Home => 0x24,
            NamedKey::Insert => 0x2D,
            NamedKey::Left => 0x25,
            NamedKey::MediaNext => 0xB0,
            NamedKey::MediaPlayPause => 0xB3,
            NamedKey::MediaPrevious => 0xB1,
            NamedKey::MediaVolumeDown => 0xAE,
            NamedKey::MediaVolumeMute => 0xAD,
            NamedKey::MediaVolumeUp => 0xAF,
            NamedKey::Menu => 0x5D,
            NamedKey::NumLock => 0x90,
            NamedKey::PageDown => 0x22,
            NamedKey::PageUp => 0x21,
            NamedKey::Pause => 0x13,
            NamedKey::PrintScreen => 0x2C,
            NamedKey::Right => 0x27,
            NamedKey::ScrollLock => 0x91,
            NamedKey::Shift => 0x10,
            NamedKey::Space => 0x20,
            NamedKey::Tab => 0x09,
            NamedKey::Up => 0x26,
        }
    }

    /// The named key a virtual-key code stands for, if any.
    pub fn from_vk(code: u32) -> Option<Self> {
        match code {
            // Side-specific modifier codes.
            0xA0 | 0xA1 => Some(NamedKey::Shift),
            0xA2 | 0xA3 => Some(NamedKey::Ctrl),
            0xA4 | 0xA5 => Some(NamedKey::Alt),
            0x5C => Some(NamedKey::Cmd),
            other => NamedKey::ALL.into_iter().find(|key| key.vk() == other),
        }
    }
}

/// Reference to a key: a symbolic name or a virtual-key code.
///
/// Codes use Windows virtual-key numbering: letters are their uppercase
/// ASCII value, digits their ASCII value, punctuation the `VK_OEM_*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRef {
    /// A named key.
    Named(NamedKey),
    /// A virtual-key code.
    Code(u32),
}

impl KeyRef {
    /// The key that types `c` on a US layout, if there is one.
    pub fn for_char(c: char) -> Option<Self> {
        let code = match c {
            'a'..='z' => u32::from(c.to_ascii_uppercase()),
            'A'..='Z' | '0'..='9' => u32::from(c),
            ' ' => return Some(KeyRef::Named(NamedKey::Space)),
            other => OEM_KEYS.iter().find(|(_, ch)| *ch == other)?.0,
        };
        Some(KeyRef::Code(code))
    }

    /// The character pressing this key types without modifiers, if any.
    pub fn typed_char(&self) -> Option<char> {
        let KeyRef::Code(code) = *self else {
            return None;
        };
        match code {
            0x41..=0x5A => char::from_u32(code).map(|c| c.to_ascii_lowercase()),
            0x30..=0x39 => char::from_u32(code),
            0x60..=0x69 => char::from_digit(code - 0x60, 10),
            0x6A => Some('*'),
            0x6B => Some('+'),
            0x6D => Some('-'),
            0x6E => Some('.'),
            0x6F => Some('/'),
            other => OEM_KEYS
                .iter()
                .find(|(vk, _)| *vk == other)
                .map(|(_, c)| *c),
        }
    }
}

const OEM_KEYS: [(u32, char); 11] = [
    (0xBA, ';'),
    (0xBB, '='),
    (0xBC, ','),
    (0xBD, '-'),
    (0xBE, '.'),
    (0xBF, '/'),
    (0xC0, '`'),
    (0xDB, '['),
    (0xDC, '\\'),
    (0xDD, ']'),
    (0xDE, '\''),
];

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRef::Named(named) => f.write_str(named.as_str()),
            // Printable codes show as their character: 65 is "A".
            KeyRef::Code(code) => match char::from_u32(*code) {
                Some(c) if (32..=126).contains(code) => write!(f, "{}", c),
                _ => write!(f, "{}", code),
            },
        }
    }
}

impl From<NamedKey> for KeyRef {
    fn from(named: NamedKey) -> Self {
        KeyRef::Named(named)
    }
}
