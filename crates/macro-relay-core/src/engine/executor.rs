//! Macro playback with timing and guaranteed release of held inputs.

use crate::{
    Command, CommandKind, CoreError, CoreResult, InputInjector, KeyRef, Macro, MacroStore,
    MouseButton,
};

use std::{
    collections::HashSet,
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Longest uninterrupted sleep between stop-signal checks.
pub(crate) const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every iteration ran to the end.
    Success,
    /// The stop signal was raised before the run finished.
    Stopped,
}

/// Shared view of a running executor: cooperative stop signal plus the
/// inputs it currently holds down.
#[derive(Debug, Clone, Default)]
pub struct ExecutionHandle {
    stop: Arc<AtomicBool>,
    held: Arc<Mutex<HeldInputs>>,
}

impl ExecutionHandle {
    /// Ask the run to stop at its next check.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Snapshot of the inputs currently held down.
    pub fn held_inputs(&self) -> HeldInputs {
        self.lock_held().clone()
    }

    fn rearm(&self) {
        self.stop.store(false, Ordering::Release);
    }

    fn lock_held(&self) -> MutexGuard<'_, HeldInputs> {
        self.held.lock().unwrap_or_else(|e| {
            error!("Held input lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

/// Keys and buttons currently held down by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldInputs {
    /// Keys pressed without a matching release yet.
    pub keys: HashSet<KeyRef>,
    /// Buttons pressed without a matching release yet.
    pub buttons: HashSet<MouseButton>,
}

impl HeldInputs {
    /// `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.buttons.is_empty()
    }
}

/// Plays a macro's command sequence against an input injector.
///
/// State machine: `Idle -> Running -> {Completed, Stopped}`. Whatever ends
/// the loop (completion, stop or an injection error), every key and button
/// still held is released before [`MacroExecutor::execute`] returns.
pub struct MacroExecutor {
    definition: Macro,
    store: Option<MacroStore>,
    handle: ExecutionHandle,
}

impl MacroExecutor {
    /// Wrap a macro for playback.
    pub fn new(definition: Macro) -> Self {
        Self {
            definition,
            store: None,
            handle: ExecutionHandle::default(),
        }
    }

    /// Store used to lazily load commands when the macro arrives empty.
    pub fn with_store(mut self, store: MacroStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a handle created before the executor, so a stop raised before
    /// the run begins is honored.
    pub fn with_handle(mut self, handle: ExecutionHandle) -> Self {
        self.handle = handle;
        self
    }

    /// The macro being played.
    pub fn definition(&self) -> &Macro {
        &self.definition
    }

    /// Handle for stopping and inspecting this executor from other threads.
    pub fn handle(&self) -> ExecutionHandle {
        self.handle.clone()
    }

    /// Raise the stop signal.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Clear a previously raised stop signal so the executor can run again.
    pub fn rearm(&self) {
        self.handle.rearm();
    }

    /// Snapshot of the inputs currently held down.
    pub fn held_inputs(&self) -> HeldInputs {
        self.handle.held_inputs()
    }

    /// Play the macro `repeat` times.
    ///
    /// A stop raised before the call makes it return
    /// [`ExecutionOutcome::Stopped`] without dispatching anything.
    #[track_caller]
    #[instrument(skip(self, injector), fields(macro_id = %self.definition.id()))]
    pub fn execute(&mut self, injector: &mut dyn InputInjector) -> CoreResult<ExecutionOutcome> {
        self.ensure_commands()?;

        *self.handle.lock_held() = HeldInputs::default();

        let start = Instant::now();
        let result = self.run(injector);
        let released = self.release_held(injector);

        match result {
            Ok(outcome) => {
                released?;
                info!(
                    ?outcome,
                    duration_ms = start.elapsed().as_millis(),
                    "Macro execution finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_error) = released {
                    warn!(error = %release_error, "Release after failed run also failed");
                }
                error!(error = %e, "Macro execution failed");
                Err(e)
            }
        }
    }

    #[track_caller]
    fn ensure_commands(&mut self) -> CoreResult<()> {
        if !self.definition.commands.is_empty() {
            return Ok(());
        }

        if let Some(store) = &self.store {
            match store.load(self.definition.id()) {
                Ok(loaded) => {
                    debug!(command_count = loaded.commands.len(), "Commands loaded lazily");
                    self.definition.commands = loaded.commands;
                }
                Err(e) => warn!(error = %e, "Lazy command load failed"),
            }
        }

        if self.definition.commands.is_empty() {
            return Err(CoreError::NoCommands {
                id: self.definition.id().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    fn run(&self, injector: &mut dyn InputInjector) -> CoreResult<ExecutionOutcome> {
        for iteration in 0..self.definition.repeat() {
            let iteration_start = Instant::now();
            debug!(iteration, "Iteration started");

            for command in &self.definition.commands {
                if self.handle.is_stopped() {
                    return Ok(ExecutionOutcome::Stopped);
                }

                if self.definition.timing {
                    let due = iteration_start
                        .checked_add(secs(command.time))
                        .unwrap_or(iteration_start);
                    if !self.sleep_until(due) {
                        return Ok(ExecutionOutcome::Stopped);
                    }
                }

                self.dispatch(command, injector)?;
            }
        }

        if self.handle.is_stopped() {
            Ok(ExecutionOutcome::Stopped)
        } else {
            Ok(ExecutionOutcome::Success)
        }
    }

    fn dispatch(&self, command: &Command, injector: &mut dyn InputInjector) -> CoreResult<()> {
        match &command.kind {
            CommandKind::Key { key, press: true } => {
                self.handle.lock_held().keys.insert(*key);
                command.execute(injector)
            }
            CommandKind::Key { key, press: false } => {
                command.execute(injector)?;
                self.handle.lock_held().keys.remove(key);
                Ok(())
            }
            CommandKind::MouseClick {
                button,
                press: true,
                ..
            } => {
                self.handle.lock_held().buttons.insert(*button);
                command.execute(injector)
            }
            CommandKind::MouseClick {
                button,
                press: false,
                ..
            } => {
                command.execute(injector)?;
                self.handle.lock_held().buttons.remove(button);
                Ok(())
            }
            CommandKind::Delay { seconds } => {
                let now = Instant::now();
                self.sleep_until(now.checked_add(secs(*seconds)).unwrap_or(now));
                Ok(())
            }
            _ => command.execute(injector),
        }
    }

    /// Sleep until `deadline` in chunks, returning `false` if stopped.
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.handle.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }

    /// Release every held key and button, each exactly once.
    fn release_held(&self, injector: &mut dyn InputInjector) -> CoreResult<()> {
        let held = std::mem::take(&mut *self.handle.lock_held());
        if held.is_empty() {
            return Ok(());
        }

        debug!(
            keys = held.keys.len(),
            buttons = held.buttons.len(),
            "Releasing held inputs"
        );

        let mut first_error = None;

        for key in held.keys {
            if let Err(e) = injector.key(key, false) {
                warn!(%key, error = %e, "Failed to release key");
                first_error.get_or_insert(e);
            }
        }
        for button in held.buttons {
            if let Err(e) = injector.button(button, false) {
                warn!(%button, error = %e, "Failed to release button");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}
