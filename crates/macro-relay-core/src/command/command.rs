use crate::{CoreResult, InputInjector, KeyRef, MouseButton};

use std::{fmt, thread, time::Duration};

/// One recorded or programmed input action, scheduled `time` seconds after
/// the start of a macro iteration.
///
/// A command has no identity beyond its position in a sequence and no
/// stored display name: [`Command::render_name`] derives it from the fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Offset in seconds from the start of the iteration. Never negative.
    pub time: f64,
    /// The action itself.
    pub kind: CommandKind,
}

/// The closed set of actions a macro can perform.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Press or release a key.
    Key {
        /// Key to act on.
        key: KeyRef,
        /// `true` for press, `false` for release.
        press: bool,
    },
    /// Press or release a mouse button after positioning the pointer.
    MouseClick {
        /// Button to act on.
        button: MouseButton,
        /// `true` for press, `false` for release.
        press: bool,
        /// Horizontal coordinate or offset.
        x: i32,
        /// Vertical coordinate or offset.
        y: i32,
        /// Whether `x`/`y` are screen coordinates rather than an offset.
        absolute: bool,
    },
    /// Move the pointer.
    MouseMove {
        /// Horizontal coordinate or offset.
        x: i32,
        /// Vertical coordinate or offset.
        y: i32,
        /// Whether `x`/`y` are screen coordinates rather than an offset.
        absolute: bool,
    },
    /// Scroll the wheel. Positive `dy` scrolls up, positive `dx` right.
    MouseScroll {
        /// Horizontal scroll steps.
        dx: i32,
        /// Vertical scroll steps.
        dy: i32,
    },
    /// Pause for a fixed time.
    Delay {
        /// Seconds to wait, rounded to milliseconds.
        seconds: f64,
    },
    /// Type a string.
    Text {
        /// Text to type.
        text: String,
    },
}

/// Partial field update for [`Command::apply_update`].
///
/// Fields that do not exist on the target variant are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandUpdate {
    /// New schedule offset (any variant).
    pub time: Option<f64>,
    /// New key (key).
    pub key: Option<KeyRef>,
    /// New press flag (key, click).
    pub press: Option<bool>,
    /// New button (click).
    pub button: Option<MouseButton>,
    /// New horizontal position (click, move).
    pub x: Option<i32>,
    /// New vertical position (click, move).
    pub y: Option<i32>,
    /// New positioning mode (click, move).
    pub absolute: Option<bool>,
    /// New horizontal scroll (scroll).
    pub dx: Option<i32>,
    /// New vertical scroll (scroll).
    pub dy: Option<i32>,
    /// New duration (delay).
    pub seconds: Option<f64>,
    /// New text (text).
    pub text: Option<String>,
}

impl Command {
    /// Key press or release.
    pub fn key(key: impl Into<KeyRef>, press: bool, time: f64) -> Self {
        Self::new(
            time,
            CommandKind::Key {
                key: key.into(),
                press,
            },
        )
    }

    /// Mouse button press or release at (or by) `x`, `y`.
    pub fn click(button: MouseButton, press: bool, x: i32, y: i32, absolute: bool, time: f64) -> Self {
        Self::new(
            time,
            CommandKind::MouseClick {
                button,
                press,
                x,
                y,
                absolute,
            },
        )
    }

    /// Pointer move to (or by) `x`, `y`.
    pub fn mouse_move(x: i32, y: i32, absolute: bool, time: f64) -> Self {
        Self::new(time, CommandKind::MouseMove { x, y, absolute })
    }

    /// Wheel scroll.
    pub fn scroll(dx: i32, dy: i32, time: f64) -> Self {
        Self::new(time, CommandKind::MouseScroll { dx, dy })
    }

    /// Fixed pause.
    pub fn delay(seconds: f64, time: f64) -> Self {
        Self::new(
            time,
            CommandKind::Delay {
                seconds: round_delay(seconds),
            },
        )
    }

    /// Typed text.
    pub fn text(text: impl Into<String>, time: f64) -> Self {
        Self::new(time, CommandKind::Text { text: text.into() })
    }

    fn new(time: f64, kind: CommandKind) -> Self {
        Self {
            time: clamp_time(time),
            kind,
        }
    }

    /// Human-readable name, always derived from the current fields.
    pub fn render_name(&self) -> String {
        match &self.kind {
            CommandKind::Key { key, press } => {
                format!("Key {} {}", key, press_word(*press))
            }
            CommandKind::MouseClick {
                button,
                press,
                x,
                y,
                absolute,
            } => {
                let preposition = if *absolute { "at" } else { "by" };
                format!("Mouse {} {} {} {}, {}", press_word(*press), button, preposition, x, y)
            }
            CommandKind::MouseMove { x, y, absolute } => {
                let preposition = if *absolute { "to" } else { "by" };
                format!("Mouse Move {} {}, {}", preposition, x, y)
            }
            CommandKind::MouseScroll { dx, dy } => format!("Mouse Scroll {}, {}", dx, dy),
            CommandKind::Delay { seconds } => format!("Delay {}", seconds),
            CommandKind::Text { text } => format!("Text input: {}", text),
        }
    }

    /// Persisted `type` tag of this command.
    pub fn kind_tag(&self) -> &'static str {
        match &self.kind {
            CommandKind::Key { .. } => "key",
            CommandKind::MouseClick { .. } => "click",
            CommandKind::MouseMove { .. } => "move",
            CommandKind::MouseScroll { .. } => "scroll",
            CommandKind::Delay { .. } => "delay",
            CommandKind::Text { .. } => "textinput",
        }
    }

    /// Apply the fields of `update` that exist on this variant.
    pub fn apply_update(&mut self, update: CommandUpdate) {
        if let Some(time) = update.time {
            self.time = clamp_time(time);
        }

        match &mut self.kind {
            CommandKind::Key { key, press } => {
                set(key, update.key);
                set(press, update.press);
            }
            CommandKind::MouseClick {
                button,
                press,
                x,
                y,
                absolute,
            } => {
                set(button, update.button);
                set(press, update.press);
                set(x, update.x);
                set(y, update.y);
                set(absolute, update.absolute);
            }
            CommandKind::MouseMove { x, y, absolute } => {
                set(x, update.x);
                set(y, update.y);
                set(absolute, update.absolute);
            }
            CommandKind::MouseScroll { dx, dy } => {
                set(dx, update.dx);
                set(dy, update.dy);
            }
            CommandKind::Delay { seconds } => {
                if let Some(value) = update.seconds {
                    *seconds = round_delay(value);
                }
            }
            CommandKind::Text { text } => set(text, update.text),
        }
    }

    /// Perform the action against `injector`.
    ///
    /// A delay blocks the calling thread for its full duration.
    pub fn execute(&self, injector: &mut dyn InputInjector) -> CoreResult<()> {
        match &self.kind {
            CommandKind::Key { key, press } => injector.key(*key, *press),
            CommandKind::MouseClick {
                button,
                press,
                x,
                y,
                absolute,
            } => {
                position_pointer(injector, *x, *y, *absolute)?;
                injector.button(*button, *press)
            }
            CommandKind::MouseMove { x, y, absolute } => {
                position_pointer(injector, *x, *y, *absolute)
            }
            CommandKind::MouseScroll { dx, dy } => injector.scroll(*dx, *dy),
            CommandKind::Delay { seconds } => {
                thread::sleep(Duration::try_from_secs_f64(*seconds).unwrap_or(Duration::ZERO));
                Ok(())
            }
            CommandKind::Text { text } => injector.text(text),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.render_name(), self.time)
    }
}

fn position_pointer(injector: &mut dyn InputInjector, x: i32, y: i32, absolute: bool) -> CoreResult<()> {
    if absolute {
        injector.move_to(x, y)
    } else {
        injector.move_by(x, y)
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn press_word(press: bool) -> &'static str {
    if press { "press" } else { "release" }
}

fn clamp_time(time: f64) -> f64 {
    if time.is_finite() { time.max(0.0) } else { 0.0 }
}

fn round_delay(seconds: f64) -> f64 {
    (clamp_time(seconds) * 1000.0).round() / 1000.0
}
