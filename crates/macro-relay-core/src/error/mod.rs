use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Macro engine errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A persisted macro (or one of its two units) does not exist.
    #[error("Macro not found: {id} {location}")]
    NotFound {
        /// Id of the missing macro.
        id: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Persisted data could not be decoded.
    #[error("Malformed data: {reason} {location}")]
    Malformed {
        /// Description of what failed to decode.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A command record carries a `type` tag this version does not know.
    #[error("Unknown command kind: {kind} {location}")]
    UnknownCommandKind {
        /// The unrecognized tag.
        kind: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Execution requested for a macro with no commands, even after a lazy load.
    #[error("Macro {id} has no commands {location}")]
    NoCommands {
        /// Id of the empty macro.
        id: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The input injection backend failed or is unavailable.
    #[error("Input injection failed: {reason} {location}")]
    InjectionFailure {
        /// Description of the injection failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The raw input listener could not be started.
    #[error("Input listener failed: {reason} {location}")]
    ListenerFailure {
        /// Description of the listener failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
