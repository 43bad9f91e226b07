//! Session state notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the notification channel.
pub const NOTIFY_CAPACITY: usize = 32;

/// Which session a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    AutoClicker,
    Recorder,
    Player,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::AutoClicker => "autoclicker",
            SessionKind::Recorder => "recorder",
            SessionKind::Player => "player",
        }
    }
}

/// A state change published by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEvent {
    pub session: SessionKind,
    /// Whether the session is still active after this change.
    pub active: bool,
    /// Clicks performed (auto-clicker) or events captured (recorder).
    pub count: u64,
    /// Events executed in the current pass (player).
    pub progress: usize,
    /// Events in the recording being played (player).
    pub total: usize,
    /// Current pass, 1-based (player).
    pub loop_index: u32,
    /// Activation the event belongs to.
    pub generation: u64,
    /// Position in the session's event order; 0 when unsequenced.
    pub sequence: u64,
}

impl StateEvent {
    pub fn new(session: SessionKind, active: bool) -> Self {
        Self {
            session,
            active,
            count: 0,
            progress: 0,
            total: 0,
            loop_index: 0,
            generation: 0,
            sequence: 0,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_progress(mut self, progress: usize, total: usize, loop_index: u32) -> Self {
        self.progress = progress;
        self.total = total;
        self.loop_index = loop_index;
        self
    }

    pub fn with_sequence(mut self, generation: u64, sequence: u64) -> Self {
        self.generation = generation;
        self.sequence = sequence;
        self
    }
}

/// Callback a session invokes on every state change, outside its lock.
pub type StateObserver = Arc<dyn Fn(StateEvent) + Send + Sync>;

/// A sequenced event held until the session lock is released.
#[must_use]
pub(crate) struct Notice {
    observer: StateObserver,
    event: StateEvent,
}

impl Notice {
    pub(crate) fn deliver(self) {
        (self.observer)(self.event)
    }
}

/// Per-session observer slot.
///
/// Sequence numbers are taken under the session lock, so they follow the
/// order of the transitions even when delivery races.
#[derive(Default)]
pub(crate) struct Announcer {
    observer: Option<StateObserver>,
    sequence: u64,
}

impl Announcer {
    pub(crate) fn set_observer(&mut self, observer: StateObserver) {
        self.observer = Some(observer);
    }

    pub(crate) fn notice(&mut self, event: StateEvent, generation: u64) -> Option<Notice> {
        self.sequence += 1;
        let observer = self.observer.clone()?;
        Some(Notice {
            observer,
            event: event.with_sequence(generation, self.sequence),
        })
    }
}

/// Fan-out of [`StateEvent`]s to any number of subscribers.
///
/// Publishing never blocks. A subscriber that falls more than
/// [`NOTIFY_CAPACITY`] events behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StateEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: StateEvent) {
        tracing::trace!(
            session = event.session.as_str(),
            active = event.active,
            "State change"
        );
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.tx.subscribe()
    }

    /// An observer that republishes one session's events into this notifier.
    ///
    /// Events arriving after a later-sequenced one are dropped, so the last
    /// event a subscriber sees matches the session's final state. Use a
    /// separate observer per session.
    pub fn observer(&self) -> StateObserver {
        let notifier = self.clone();
        let last = Mutex::new(0u64);
        Arc::new(move |event: StateEvent| {
            let mut last = last.lock();
            if event.sequence != 0 {
                if event.sequence <= *last {
                    tracing::trace!(
                        session = event.session.as_str(),
                        sequence = event.sequence,
                        "Dropping superseded state change"
                    );
                    return;
                }
                *last = event.sequence;
            }
            notifier.publish(event);
        })
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
