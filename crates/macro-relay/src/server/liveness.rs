use crate::server::{ServerEvent, Session, SessionId};

use std::time::{Duration, Instant};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::debug;

/// Tick the event loop every `interval` until it goes away.
pub(crate) fn spawn_monitor(
    interval: Duration,
    events: mpsc::UnboundedSender<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if events.send(ServerEvent::LivenessTick).is_err() {
                debug!("Event loop gone, liveness monitor exiting");
                break;
            }
        }
    })
}

/// Sessions silent for longer than `timeout` at `now`.
pub(crate) fn stale_sessions<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    now: Instant,
    timeout: Duration,
) -> Vec<SessionId> {
    sessions
        .into_iter()
        .filter(|session| session.is_stale(now, timeout))
        .map(|session| session.id)
        .collect()
}
