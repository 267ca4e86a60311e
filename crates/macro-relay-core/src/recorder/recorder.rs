//! Turns raw input events into timestamped commands.

use crate::{
    Command, CoreError, CoreResult, InputChannel, InputHub, RawInputEvent, RecorderOptions,
    SubscriptionId, system_hub,
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

/// Capacity of each recorded-command broadcast channel.
const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Listening state published by [`Recorder::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    /// Not capturing.
    Idle,
    /// Subscriptions are live and events are being recorded.
    Listening,
}

/// Which recorded commands a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderChannel {
    /// Every recorded command.
    All,
    /// Keyboard commands only.
    Keyboard,
    /// Mouse commands only.
    Mouse,
}

#[derive(Debug)]
struct CaptureClock {
    start: Instant,
    origin: (i32, i32),
    last_move: Option<Instant>,
}

struct RecorderInner {
    options: RecorderOptions,
    hub: Arc<InputHub>,
    listening: AtomicBool,
    clock: Mutex<CaptureClock>,
    events: Mutex<Vec<Command>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    all_tx: broadcast::Sender<Command>,
    keyboard_tx: broadcast::Sender<Command>,
    mouse_tx: broadcast::Sender<Command>,
    status_tx: watch::Sender<RecorderStatus>,
}

/// Input recorder.
///
/// State machine: `Idle -> Listening -> Idle`. While listening, one worker
/// thread per enabled channel (keyboard, mouse) drains its hub subscription
/// and records events. The two channels are not ordered relative to each
/// other.
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

impl Recorder {
    /// Create an idle recorder reading from `hub`.
    pub fn new(options: RecorderOptions, hub: Arc<InputHub>) -> Self {
        let (all_tx, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
        let (keyboard_tx, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
        let (mouse_tx, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
        let (status_tx, _) = watch::channel(RecorderStatus::Idle);

        Self {
            inner: Arc::new(RecorderInner {
                options,
                hub,
                listening: AtomicBool::new(false),
                clock: Mutex::new(CaptureClock {
                    start: Instant::now(),
                    origin: (0, 0),
                    last_move: None,
                }),
                events: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                workers: Mutex::new(Vec::new()),
                all_tx,
                keyboard_tx,
                mouse_tx,
                status_tx,
            }),
        }
    }

    /// Create a recorder reading from the OS input listener.
    pub fn with_system_input(options: RecorderOptions) -> Self {
        Self::new(options, system_hub())
    }

    /// Options this recorder was built with.
    pub fn options(&self) -> &RecorderOptions {
        &self.inner.options
    }

    /// Receive recorded commands of one channel, in insertion order.
    pub fn subscribe(&self, channel: RecorderChannel) -> broadcast::Receiver<Command> {
        match channel {
            RecorderChannel::All => self.inner.all_tx.subscribe(),
            RecorderChannel::Keyboard => self.inner.keyboard_tx.subscribe(),
            RecorderChannel::Mouse => self.inner.mouse_tx.subscribe(),
        }
    }

    /// Watch the listening state. Flips to `Idle` when the stop key is hit.
    pub fn status(&self) -> watch::Receiver<RecorderStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Whether subscriptions are live.
    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::Acquire)
    }

    /// Snapshot of everything recorded since the last start.
    pub fn events(&self) -> Vec<Command> {
        self.inner.lock_events().clone()
    }

    /// Reset and start capturing.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start(&self) -> CoreResult<()> {
        self.stop(true);

        self.inner.lock_events().clear();
        {
            let mut clock = self.inner.lock_clock();
            clock.start = Instant::now();
            clock.origin = self.inner.hub.pointer_position();
            clock.last_move = None;
        }

        self.inner.listening.store(true, Ordering::Release);

        let mut channels = vec![InputChannel::Keyboard];
        if self.inner.options.records_mouse() {
            channels.push(InputChannel::Mouse);
        }

        for channel in channels {
            match spawn_worker(Arc::clone(&self.inner), channel) {
                Ok(handle) => self.inner.lock_workers().push(handle),
                Err(e) => {
                    self.stop(true);
                    return Err(e);
                }
            }
        }

        self.inner.status_tx.send_replace(RecorderStatus::Listening);
        info!("Recording started");

        Ok(())
    }

    /// Start, then shift the clock so new timestamps continue from `at_time`.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn resume(&self, at_time: f64) -> CoreResult<()> {
        self.start()?;

        let offset = Duration::try_from_secs_f64(at_time).unwrap_or(Duration::ZERO);
        let mut clock = self.inner.lock_clock();
        clock.start = Instant::now().checked_sub(offset).unwrap_or(clock.start);

        Ok(())
    }

    /// End both subscriptions.
    ///
    /// With `block` the call waits for the worker threads to exit. Pass
    /// `false` when stopping from inside a recorder callback.
    #[instrument(skip(self))]
    pub fn stop(&self, block: bool) {
        self.inner.stop(block);
    }

    /// Record `event` as if it had been observed at `now`.
    ///
    /// Subscription workers call this with the current instant. Returns the
    /// recorded command, or `None` when the event was filtered out.
    pub fn record_event_at(&self, event: RawInputEvent, now: Instant) -> Option<Command> {
        self.inner.handle(event, now)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.inner.stop(false);
    }
}

impl RecorderInner {
    fn handle(&self, event: RawInputEvent, now: Instant) -> Option<Command> {
        if !self.listening.load(Ordering::Acquire) {
            return None;
        }

        let options = &self.options;

        let command = match event {
            RawInputEvent::KeyPress(key) if key == options.stop_key => {
                info!(%key, "Stop key pressed");
                self.stop(false);
                return None;
            }
            RawInputEvent::KeyPress(key) | RawInputEvent::KeyRelease(key) => {
                if !options.record_keyboard {
                    return None;
                }
                let press = matches!(event, RawInputEvent::KeyPress(_));
                Command::key(key, press, self.timestamp(now))
            }
            RawInputEvent::MouseMove { x, y } => {
                if !options.record_mouse_move || !self.accept_move(now) {
                    return None;
                }
                let (x, y) = self.translate(x, y);
                Command::mouse_move(x, y, !options.mouse_position_relative, self.timestamp(now))
            }
            RawInputEvent::MouseButton {
                button,
                press,
                x,
                y,
            } => {
                if !options.record_mouse_click {
                    return None;
                }
                let (x, y) = self.translate(x, y);
                Command::click(
                    button,
                    press,
                    x,
                    y,
                    !options.mouse_position_relative,
                    self.timestamp(now),
                )
            }
            RawInputEvent::MouseScroll { dx, dy } => {
                if !options.record_mouse_scroll {
                    return None;
                }
                Command::scroll(dx, dy, self.timestamp(now))
            }
        };

        self.lock_events().push(command.clone());

        // Send errors only mean nobody is subscribed.
        let _ = self.all_tx.send(command.clone());
        let channel_tx = match event.channel() {
            InputChannel::Keyboard => &self.keyboard_tx,
            InputChannel::Mouse => &self.mouse_tx,
        };
        let _ = channel_tx.send(command.clone());

        Some(command)
    }

    /// Throttle pointer moves to one per `move_timeout`.
    fn accept_move(&self, now: Instant) -> bool {
        let mut clock = self.lock_clock();
        let min_gap = Duration::try_from_secs_f64(self.options.move_timeout).unwrap_or(Duration::ZERO);

        if let Some(last) = clock.last_move
            && now.saturating_duration_since(last) < min_gap
        {
            return false;
        }

        clock.last_move = Some(now);
        true
    }

    fn translate(&self, x: i32, y: i32) -> (i32, i32) {
        if !self.options.mouse_position_relative {
            return (x, y);
        }
        let (origin_x, origin_y) = self.lock_clock().origin;
        (x.saturating_sub(origin_x), y.saturating_sub(origin_y))
    }

    fn timestamp(&self, now: Instant) -> f64 {
        if !self.options.record_time {
            return 0.0;
        }
        let start = self.lock_clock().start;
        now.saturating_duration_since(start).as_secs_f64() + self.options.time_offset
    }

    fn stop(&self, block: bool) {
        let was_listening = self.listening.swap(false, Ordering::AcqRel);

        for id in std::mem::take(&mut *self.lock_subscriptions()) {
            self.hub.unsubscribe(id);
        }

        self.status_tx.send_replace(RecorderStatus::Idle);

        if was_listening {
            info!(event_count = self.lock_events().len(), "Recording stopped");
        }

        let workers = std::mem::take(&mut *self.lock_workers());
        if !block {
            return;
        }

        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!("Recorder worker panicked");
            }
        }
    }

    fn lock_events(&self) -> MutexGuard<'_, Vec<Command>> {
        self.events.lock().unwrap_or_else(|e| {
            error!("Recorded events lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    fn lock_clock(&self) -> MutexGuard<'_, CaptureClock> {
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<SubscriptionId>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[track_caller]
fn spawn_worker(inner: Arc<RecorderInner>, channel: InputChannel) -> CoreResult<JoinHandle<()>> {
    let (id, mut rx) = inner.hub.subscribe(channel);
    inner.lock_subscriptions().push(id);

    let name = match channel {
        InputChannel::Keyboard => "recorder-keyboard",
        InputChannel::Mouse => "recorder-mouse",
    };

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            while let Some(event) = rx.blocking_recv() {
                inner.handle(event, Instant::now());
            }
            debug!(?channel, "Recorder subscription ended");
        })
        .map_err(|e| CoreError::ListenerFailure {
            reason: format!("Failed to spawn {} thread: {}", name, e),
            location: ErrorLocation::from(Location::caller()),
        })
}
