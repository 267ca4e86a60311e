//! One connected client: socket reader, socket writer and liveness state.

use crate::{
    AppError, AppResult,
    server::{LineBuffer, ServerEvent, ServerMessage},
};

use std::{
    fmt,
    net::SocketAddr,
    panic::Location,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time,
};
use tracing::{debug, warn};
use uuid::Uuid;

const READ_CHUNK: usize = 4096;

/// Lines a session may have queued before it counts as unresponsive.
pub(crate) const OUTBOUND_CAPACITY: usize = 64;

/// How long a closed session's writer may keep flushing.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Unique id of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-side state of one connection.
///
/// The reader task turns incoming bytes into [`ServerEvent::Frame`]s; the
/// writer task drains the bounded outbound queue. A full queue fails
/// [`Session::send`]. Closing drops both halves of the socket.
pub(crate) struct Session {
    pub(crate) id: SessionId,
    pub(crate) addr: SocketAddr,
    pub(crate) authorized: bool,
    pub(crate) last_heartbeat: Instant,
    outbound: mpsc::Sender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Session {
    /// Take ownership of `stream` and start its reader and writer tasks.
    pub(crate) fn spawn(
        stream: TcpStream,
        addr: SocketAddr,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        let id = SessionId::new();
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        let reader = tokio::spawn(read_frames(id, read_half, events.clone()));
        let writer = tokio::spawn(write_frames(id, write_half, outbound_rx, events));

        Self {
            id,
            addr,
            authorized: false,
            last_heartbeat: Instant::now(),
            outbound,
            reader,
            writer,
        }
    }

    /// Queue `message` for this session. Fails when the queue is full or
    /// the writer is gone.
    #[track_caller]
    pub(crate) fn send(&self, message: &ServerMessage) -> AppResult<()> {
        let line = message.encode()?;
        self.outbound.try_send(line).map_err(|e| {
            let state = match e {
                TrySendError::Full(_) => "full",
                TrySendError::Closed(_) => "closed",
            };
            AppError::ChannelSendFailed {
                message: format!("Session {} outbound queue {}", self.id, state),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }

    pub(crate) fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) > timeout
    }

    /// Stop reading and give the writer [`CLOSE_FLUSH_TIMEOUT`] to flush
    /// what is queued. A writer stuck on a peer that does not read is
    /// aborted, which drops the socket.
    pub(crate) fn close(self) {
        let Self {
            id,
            reader,
            outbound,
            mut writer,
            ..
        } = self;
        reader.abort();
        drop(outbound);

        tokio::spawn(async move {
            if time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await.is_err() {
                debug!(session_id = %id, "Writer did not flush in time, aborting");
                writer.abort();
            }
        });
    }
}

/// Send `hello/reject` on a connection that never becomes a session.
pub(crate) async fn reject(mut stream: TcpStream) {
    match ServerMessage::HelloReject.encode() {
        Ok(line) => {
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                debug!(error = %e, "Failed to send rejection");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode rejection"),
    }
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "Failed to shut down rejected connection");
    }
}

async fn read_frames(
    id: SessionId,
    mut read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut frames = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    let reason = 'read: loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => break "connection closed by peer".to_string(),
            Ok(n) => {
                frames.extend(&chunk[..n]);
                loop {
                    match frames.next_line() {
                        Ok(Some(line)) => {
                            if events.send(ServerEvent::Frame { session: id, line }).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => break 'read e.to_string(),
                    }
                }
            }
            Err(e) => break e.to_string(),
        }
    };

    // Send errors only mean the server is already gone.
    let _ = events.send(ServerEvent::Closed {
        session: id,
        reason,
    });
}

async fn write_frames(
    id: SessionId,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    while let Some(line) = outbound.recv().await {
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            let _ = events.send(ServerEvent::Closed {
                session: id,
                reason: e.to_string(),
            });
            return;
        }
    }

    if let Err(e) = write_half.shutdown().await {
        debug!(session_id = %id, error = %e, "Socket shutdown failed");
    }
}
