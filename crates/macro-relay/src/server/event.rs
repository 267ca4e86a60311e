use crate::server::{RunToken, SessionId};

use macro_relay_core::{CoreResult, ExecutionOutcome};

/// Result of a background run. `Err` carries the reason the worker died.
pub(crate) type ExecutionResult = Result<CoreResult<ExecutionOutcome>, String>;

/// Everything the event loop reacts to besides new connections.
#[derive(Debug)]
pub(crate) enum ServerEvent {
    /// A complete line arrived from a session.
    Frame { session: SessionId, line: String },
    /// A session's socket closed or failed.
    Closed { session: SessionId, reason: String },
    /// A macro run ended.
    ExecutionFinished {
        token: RunToken,
        macro_id: String,
        result: ExecutionResult,
    },
    /// Time to look for silent sessions.
    LivenessTick,
}
