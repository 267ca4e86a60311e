//! Fan-out of raw input events to per-channel subscribers.

use crate::{KeyRef, MouseButton};

use std::sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc;
use tracing::{debug, error};

/// Event channel a subscriber listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputChannel {
    /// Key presses and releases.
    Keyboard,
    /// Pointer moves, button presses and releases, wheel scrolls.
    Mouse,
}

/// A raw input event as observed at the OS level.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    /// A key went down.
    KeyPress(KeyRef),
    /// A key went up.
    KeyRelease(KeyRef),
    /// The pointer moved to absolute screen coordinates.
    MouseMove {
        /// Horizontal screen coordinate.
        x: i32,
        /// Vertical screen coordinate.
        y: i32,
    },
    /// A mouse button changed state at the given position.
    MouseButton {
        /// Button that changed.
        button: MouseButton,
        /// `true` when pressed.
        press: bool,
        /// Horizontal screen coordinate.
        x: i32,
        /// Vertical screen coordinate.
        y: i32,
    },
    /// The wheel scrolled.
    MouseScroll {
        /// Horizontal steps.
        dx: i32,
        /// Vertical steps, positive up.
        dy: i32,
    },
}

impl RawInputEvent {
    /// Channel this event is delivered on.
    pub fn channel(&self) -> InputChannel {
        match self {
            RawInputEvent::KeyPress(_) | RawInputEvent::KeyRelease(_) => InputChannel::Keyboard,
            RawInputEvent::MouseMove { .. }
            | RawInputEvent::MouseButton { .. }
            | RawInputEvent::MouseScroll { .. } => InputChannel::Mouse,
        }
    }
}

/// Handle returned by [`InputHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    channel: InputChannel,
    tx: mpsc::UnboundedSender<RawInputEvent>,
}

/// Distributes raw input events to subscribers and tracks the last known
/// pointer position.
///
/// Dropping a subscription's sender (via [`InputHub::unsubscribe`]) ends the
/// subscriber's receive loop once queued events are drained.
pub struct InputHub {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
    pointer: Mutex<(i32, i32)>,
}

impl InputHub {
    /// Create an empty hub with the pointer at the origin.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
            pointer: Mutex::new((0, 0)),
        }
    }

    /// Subscribe to one channel.
    pub fn subscribe(
        &self,
        channel: InputChannel,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<RawInputEvent>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        self.lock_subscribers().push(Subscriber { id, channel, tx });
        debug!(subscription = id.0, ?channel, "Input subscription added");

        (id, rx)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    /// Deliver `event` to every subscriber of its channel.
    pub fn publish(&self, event: RawInputEvent) {
        match &event {
            RawInputEvent::MouseMove { x, y } | RawInputEvent::MouseButton { x, y, .. } => {
                *self.lock_pointer() = (*x, *y);
            }
            _ => {}
        }

        let channel = event.channel();
        let mut subscribers = self.lock_subscribers();
        // Receivers that went away are pruned on the way.
        subscribers.retain(|s| s.channel != channel || s.tx.send(event.clone()).is_ok());
    }

    /// Last pointer position seen by the hub.
    pub fn pointer_position(&self) -> (i32, i32) {
        *self.lock_pointer()
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: InputChannel) -> usize {
        self.lock_subscribers()
            .iter()
            .filter(|s| s.channel == channel)
            .count()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| {
            error!("Input subscriber list lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    fn lock_pointer(&self) -> std::sync::MutexGuard<'_, (i32, i32)> {
        self.pointer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new()
    }
}
