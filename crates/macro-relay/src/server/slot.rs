//! The process-wide permission to run one macro at a time.

use std::{
    fmt,
    sync::{Mutex, MutexGuard},
};

use macro_relay_core::ExecutionHandle;
use tracing::{debug, error};
use uuid::Uuid;

/// Proof of ownership for one occupation of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RunToken(Uuid);

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
struct Running {
    token: RunToken,
    macro_id: String,
    handle: ExecutionHandle,
}

/// Arbiter for the single execution slot.
///
/// Occupying is atomic, so two requests can never both see the slot free.
/// A release only clears the slot when the token still owns it.
#[derive(Debug, Default)]
pub(crate) struct ExecutionSlot {
    current: Mutex<Option<Running>>,
}

impl ExecutionSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Occupy the slot for `macro_id`.
    ///
    /// On success returns the run's token and the stop handle the executor
    /// must use. Otherwise returns the id of the macro already running.
    pub(crate) fn try_occupy(&self, macro_id: &str) -> Result<(RunToken, ExecutionHandle), String> {
        let mut current = self.lock();

        if let Some(running) = current.as_ref() {
            return Err(running.macro_id.clone());
        }

        let token = RunToken(Uuid::new_v4());
        let handle = ExecutionHandle::default();
        *current = Some(Running {
            token,
            macro_id: macro_id.to_string(),
            handle: handle.clone(),
        });
        debug!(%macro_id, run_id = %token, "Execution slot occupied");

        Ok((token, handle))
    }

    /// Signal the running macro to stop and free the slot.
    pub(crate) fn stop_current(&self) -> Option<String> {
        let running = self.lock().take()?;
        running.handle.stop();
        debug!(macro_id = %running.macro_id, run_id = %running.token, "Execution slot stopped");
        Some(running.macro_id)
    }

    /// Free the slot if `token` still owns it. Returns whether it did.
    pub(crate) fn release(&self, token: RunToken) -> bool {
        let mut current = self.lock();
        match current.as_ref() {
            Some(running) if running.token == token => {
                *current = None;
                debug!(run_id = %token, "Execution slot released");
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.current.lock().unwrap_or_else(|e| {
            error!("Execution slot lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}
