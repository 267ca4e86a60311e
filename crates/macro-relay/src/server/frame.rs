use crate::{AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;

/// Longest line accepted before the peer is considered broken.
pub(crate) const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Per-session receive buffer that yields complete lines.
#[derive(Debug)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }

    pub(crate) fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Take the next complete line, without its terminator.
    ///
    /// Returns `Ok(None)` when no full line is buffered yet, and an error
    /// for non-UTF-8 lines or when the pending bytes exceed the limit.
    #[track_caller]
    pub(crate) fn next_line(&mut self) -> AppResult<Option<String>> {
        let Some(newline) = self.buf.iter().position(|b| *b == b'\n') else {
            if self.buf.len() > self.max_len {
                return Err(AppError::Protocol {
                    reason: format!("Frame exceeds {} bytes without a newline", self.max_len),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            return Ok(None);
        };

        let mut line: Vec<u8> = self.buf.drain(..=newline).collect();
        line.pop();

        String::from_utf8(line)
            .map(Some)
            .map_err(|e| AppError::Protocol {
                reason: format!("Frame is not UTF-8: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
