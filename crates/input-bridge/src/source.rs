//! Captured input delivery.

use std::sync::Arc;

use macrokit_common::error::{MacroError, MacroResult};
use macrokit_recording_model::event::EventKind;
use parking_lot::Mutex;

/// Callback receiving captured input, possibly from a foreign thread.
pub type EventSink = Arc<dyn Fn(EventKind) + Send + Sync>;

/// Trait for input capture backends.
pub trait EventSource: Send + Sync {
    /// Install the capture hook and start delivering events to `sink`.
    fn subscribe(&self, sink: EventSink) -> MacroResult<()>;

    /// Remove the capture hook.
    ///
    /// Once this returns, `sink` is never called again.
    fn unsubscribe(&self) -> MacroResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Check if the backend can be installed on this system.
    fn is_available(&self) -> bool;
}

/// Event source driven by explicit [`ManualEventSource::emit`] calls.
///
/// Delivery happens while the source lock is held, so `unsubscribe`
/// blocks until any in-flight delivery has returned.
pub struct ManualEventSource {
    sink: Mutex<Option<EventSink>>,
    available: Mutex<bool>,
}

impl ManualEventSource {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            available: Mutex::new(true),
        }
    }

    /// Make subsequent `subscribe` calls fail, as when a hook cannot be installed.
    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    /// Deliver one event. Returns `false` when nobody is subscribed.
    pub fn emit(&self, kind: EventKind) -> bool {
        let guard = self.sink.lock();
        match guard.as_ref() {
            Some(sink) => {
                sink(kind);
                true
            }
            None => false,
        }
    }

    /// Whether a sink is currently installed.
    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }
}

impl Default for ManualEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for ManualEventSource {
    fn subscribe(&self, sink: EventSink) -> MacroResult<()> {
        if !self.is_available() {
            return Err(MacroError::capture("manual event source is unavailable"));
        }
        let mut guard = self.sink.lock();
        if guard.is_some() {
            return Err(MacroError::capture("manual event source already has a subscriber"));
        }
        *guard = Some(sink);
        tracing::debug!("Manual event source subscribed");
        Ok(())
    }

    fn unsubscribe(&self) -> MacroResult<()> {
        self.sink.lock().take();
        tracing::debug!("Manual event source unsubscribed");
        Ok(())
    }

    fn name(&self) -> &str {
        "manual"
    }

    fn is_available(&self) -> bool {
        *self.available.lock()
    }
}
