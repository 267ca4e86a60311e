use std::fmt;

/// Mouse buttons a click command can press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// First extra button (usually "back").
    X1,
    /// Second extra button (usually "forward").
    X2,
}

impl MouseButton {
    /// Persisted 3-tuple: down flag, up flag, extra data.
    pub fn to_raw(self) -> [u32; 3] {
        match self {
            MouseButton::Left => [2, 4, 0],
            MouseButton::Right => [8, 16, 0],
            MouseButton::Middle => [32, 64, 0],
            MouseButton::X1 => [128, 256, 1],
            MouseButton::X2 => [128, 256, 2],
        }
    }

    /// Inverse of [`MouseButton::to_raw`].
    pub fn from_raw(raw: [u32; 3]) -> Option<Self> {
        let button = match raw {
            [2, 4, 0] => MouseButton::Left,
            [8, 16, 0] => MouseButton::Right,
            [32, 64, 0] => MouseButton::Middle,
            [128, 256, 1] => MouseButton::X1,
            [128, 256, 2] => MouseButton::X2,
            _ => return None,
        };
        Some(button)
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::X1 => "x1",
            MouseButton::X2 => "x2",
        };
        f.write_str(name)
    }
}
