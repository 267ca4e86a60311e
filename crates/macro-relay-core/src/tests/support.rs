use crate::{CoreError, CoreResult, KeyRef, KeyboardInjector, MouseButton, MouseInjector};

use std::{panic::Location, time::Instant};

use error_location::ErrorLocation;

/// One action observed by [`RecordingInjector`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Injected {
    Key(KeyRef, bool),
    Text(String),
    MoveTo(i32, i32),
    MoveBy(i32, i32),
    Button(MouseButton, bool),
    Scroll(i32, i32),
}

/// Injector double that logs every action with the instant it happened.
#[derive(Debug, Default)]
pub(crate) struct RecordingInjector {
    pub(crate) log: Vec<(Instant, Injected)>,
    /// Fail the action with this zero-based index.
    pub(crate) fail_at: Option<usize>,
}

impl RecordingInjector {
    pub(crate) fn actions(&self) -> Vec<Injected> {
        self.log.iter().map(|(_, action)| action.clone()).collect()
    }

    pub(crate) fn count(&self, action: &Injected) -> usize {
        self.log.iter().filter(|(_, a)| a == action).count()
    }

    #[track_caller]
    fn push(&mut self, action: Injected) -> CoreResult<()> {
        if self.fail_at == Some(self.log.len()) {
            self.fail_at = None;
            return Err(CoreError::InjectionFailure {
                reason: format!("Injected failure on {:?}", action),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.log.push((Instant::now(), action));
        Ok(())
    }
}

impl KeyboardInjector for RecordingInjector {
    fn key(&mut self, key: KeyRef, press: bool) -> CoreResult<()> {
        self.push(Injected::Key(key, press))
    }

    fn text(&mut self, text: &str) -> CoreResult<()> {
        self.push(Injected::Text(text.to_string()))
    }
}

impl MouseInjector for RecordingInjector {
    fn move_to(&mut self, x: i32, y: i32) -> CoreResult<()> {
        self.push(Injected::MoveTo(x, y))
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> CoreResult<()> {
        self.push(Injected::MoveBy(dx, dy))
    }

    fn button(&mut self, button: MouseButton, press: bool) -> CoreResult<()> {
        self.push(Injected::Button(button, press))
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> CoreResult<()> {
        self.push(Injected::Scroll(dx, dy))
    }
}

/// Poll `condition` until it holds or `timeout_ms` elapses.
pub(crate) fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + std::time::Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    condition()
}
