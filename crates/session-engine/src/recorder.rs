//! Macro recording session.
//!
//! The recorder subscribes a sink to an [`EventSource`] and appends each
//! accepted event to a fresh [`Recording`], stamped with the time elapsed
//! since the session started.
//!
//! Two locks are involved. `control` serializes start and stop, and is held
//! while the source is subscribed or unsubscribed. The data lock inside
//! `Shared` is the only one the sink takes, so a source that delivers
//! synchronously while unsubscribing cannot deadlock against `stop`.

use std::sync::Arc;
use std::time::Duration;

use macrokit_common::clock::RecordingClock;
use macrokit_common::error::{MacroError, MacroResult};
use macrokit_input_bridge::{EventSink, EventSource};
use macrokit_recording_model::event::{EventKind, InputEvent};
use macrokit_recording_model::recording::Recording;
use parking_lot::Mutex;

use crate::config::RecorderOptions;
use crate::notify::{Announcer, Notice, SessionKind, StateEvent, StateObserver};

/// State of the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

struct Inner {
    state: RecorderState,
    options: RecorderOptions,
    recording: Option<Recording>,
    clock: Option<RecordingClock>,
    generation: u64,
    announcer: Announcer,
}

impl Inner {
    fn notice(&mut self, active: bool) -> Option<Notice> {
        let count = self.recording.as_ref().map_or(0, |r| r.len() as u64);
        let event = StateEvent::new(SessionKind::Recorder, active).with_count(count);
        self.announcer.notice(event, self.generation)
    }
}

struct Shared {
    inner: Mutex<Inner>,
}

/// A macro recording session.
pub struct Recorder {
    source: Arc<dyn EventSource>,
    shared: Arc<Shared>,
    control: Mutex<()>,
}

impl Recorder {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self::with_options(source, RecorderOptions::default())
    }

    pub fn with_options(source: Arc<dyn EventSource>, options: RecorderOptions) -> Self {
        Self {
            source,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: RecorderState::Idle,
                    options,
                    recording: None,
                    clock: None,
                    generation: 0,
                    announcer: Announcer::default(),
                }),
            }),
            control: Mutex::new(()),
        }
    }

    /// Install the callback that receives a notification per captured event.
    pub fn set_observer(&self, observer: StateObserver) {
        self.shared.inner.lock().announcer.set_observer(observer);
    }

    pub fn state(&self) -> RecorderState {
        self.shared.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Recording
    }

    pub fn options(&self) -> RecorderOptions {
        self.shared.inner.lock().options.clone()
    }

    /// Replace the filters and naming used from the next start on.
    pub fn set_options(&self, options: RecorderOptions) {
        self.shared.inner.lock().options = options;
    }

    /// Rename the recording in progress and any later ones.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        let mut inner = self.shared.inner.lock();
        if let Some(recording) = inner.recording.as_mut() {
            recording.name = name.clone();
        }
        inner.options.name = name;
    }

    /// Events captured so far in the current session.
    pub fn event_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .recording
            .as_ref()
            .map_or(0, Recording::len)
    }

    /// Time since the session started, or zero when idle.
    pub fn duration(&self) -> Duration {
        let inner = self.shared.inner.lock();
        match (inner.state, inner.clock.as_ref()) {
            (RecorderState::Recording, Some(clock)) => clock.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Begin capturing. Does nothing if already recording.
    ///
    /// The clock and the empty recording are in place before the source is
    /// subscribed, so events delivered during `subscribe` are kept. Fails
    /// with [`MacroError::Capture`] when the source cannot be subscribed,
    /// leaving the recorder idle.
    pub fn start(&self) -> MacroResult<()> {
        let _control = self.control.lock();

        let generation = {
            let mut inner = self.shared.inner.lock();
            if inner.state == RecorderState::Recording {
                return Ok(());
            }
            inner.generation += 1;
            let clock = RecordingClock::start();
            let name = inner.options.name.clone();
            inner.recording = Some(Recording::with_created_at(name, clock.epoch_wall()));
            inner.clock = Some(clock);
            inner.generation
        };

        let shared = self.shared.clone();
        let sink: EventSink = Arc::new(move |kind| ingest(&shared, generation, kind));
        if let Err(e) = self.source.subscribe(sink) {
            let mut inner = self.shared.inner.lock();
            inner.recording = None;
            inner.clock = None;
            drop(inner);

            tracing::warn!(source = self.source.name(), error = %e, "Failed to start input capture");
            return Err(match e {
                MacroError::Capture { .. } => e,
                other => MacroError::capture(other.to_string()),
            });
        }

        let notice = {
            let mut inner = self.shared.inner.lock();
            inner.state = RecorderState::Recording;
            tracing::info!(
                source = self.source.name(),
                name = %inner.options.name,
                generation,
                "Recording started"
            );
            inner.notice(true)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        Ok(())
    }

    /// Stop capturing and hand over the finished recording.
    ///
    /// Returns `Ok(None)` when not recording. If the source cannot be
    /// unsubscribed the recorder keeps recording and the error is returned.
    pub fn stop(&self) -> MacroResult<Option<Recording>> {
        let _control = self.control.lock();

        if self.shared.inner.lock().state != RecorderState::Recording {
            return Ok(None);
        }

        self.source.unsubscribe().map_err(|e| {
            tracing::warn!(source = self.source.name(), error = %e, "Failed to stop input capture");
            match e {
                MacroError::Capture { .. } => e,
                other => MacroError::capture(other.to_string()),
            }
        })?;

        let mut inner = self.shared.inner.lock();
        let elapsed_ns = inner.clock.take().map_or(0, |clock| clock.elapsed_ns());
        inner.state = RecorderState::Idle;
        let trim = inner.options.trim_trailing_idle;
        let notice = inner.notice(false);
        let Some(mut recording) = inner.recording.take() else {
            return Ok(None);
        };
        drop(inner);
        if let Some(notice) = notice {
            notice.deliver();
        }

        recording.duration_ns = if trim {
            recording.last_timestamp_ns().unwrap_or(0)
        } else {
            elapsed_ns.max(recording.duration_ns)
        };
        recording.finalize();

        tracing::info!(
            events = recording.len(),
            duration_ms = recording.duration().as_millis() as u64,
            "Recording stopped"
        );
        Ok(Some(recording))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_recording() {
            if let Err(e) = self.source.unsubscribe() {
                tracing::warn!(error = %e, "Failed to release input capture on drop");
            }
        }
    }
}

/// Events count while the recording for `generation` exists, which spans
/// the whole subscription.
fn ingest(shared: &Shared, generation: u64, kind: EventKind) {
    let notice = {
        let mut inner = shared.inner.lock();
        if inner.generation != generation || inner.recording.is_none() {
            return;
        }
        if !accepts(&inner.options, &kind) {
            return;
        }
        let timestamp_ns = match inner.clock.as_ref() {
            Some(clock) => clock.elapsed_ns(),
            None => return,
        };
        let Some(recording) = inner.recording.as_mut() else {
            return;
        };
        recording.add_event(InputEvent::new(timestamp_ns, kind));
        inner.notice(true)
    };

    if let Some(notice) = notice {
        notice.deliver();
    }
}

fn accepts(options: &RecorderOptions, kind: &EventKind) -> bool {
    match kind.key_code() {
        Some(code) => options.record_keyboard && !options.filtered_keys.contains(&code),
        None => options.record_mouse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrokit_input_bridge::ManualEventSource;
    use macrokit_recording_model::event::{ButtonState, MouseButton};

    fn recorder() -> (Recorder, Arc<ManualEventSource>) {
        let source = Arc::new(ManualEventSource::new());
        (Recorder::new(source.clone()), source)
    }

    #[test]
    fn test_records_events_in_order() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();
        assert!(recorder.is_recording());

        source.emit(EventKind::pointer_move(1, 1));
        std::thread::sleep(Duration::from_millis(2));
        source.emit(EventKind::button(MouseButton::Left, ButtonState::Down, 1, 1));
        source.emit(EventKind::scroll(120, 1, 1));
        assert_eq!(recorder.event_count(), 3);

        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 3);
        assert!(recording.validate().is_empty());
        assert!(recording.events[1].timestamp_ns > recording.events[0].timestamp_ns);
        assert!(recording.duration_ns >= recording.last_timestamp_ns().unwrap());
        assert_eq!(recording.metadata.event_count, 3);
        assert!(!source.is_subscribed());
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn test_default_filter_drops_hotkeys() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();

        source.emit(EventKind::key(0x78, 0, ButtonState::Down));
        source.emit(EventKind::key(0x41, 0, ButtonState::Down));
        source.emit(EventKind::key(0x7A, 0, ButtonState::Up));

        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 1);
        assert_eq!(recording.events[0].kind.key_code(), Some(0x41));
    }

    #[test]
    fn test_mouse_and_keyboard_toggles() {
        let (recorder, source) = recorder();
        recorder.set_options(RecorderOptions {
            record_mouse: false,
            ..Default::default()
        });
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(5, 5));
        source.emit(EventKind::key(0x20, 0, ButtonState::Down));
        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 1);
        assert!(!recording.events[0].kind.is_mouse());

        recorder.set_options(RecorderOptions {
            record_keyboard: false,
            ..Default::default()
        });
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(5, 5));
        source.emit(EventKind::key(0x20, 0, ButtonState::Down));
        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 1);
        assert!(recording.events[0].kind.is_mouse());
    }

    #[test]
    fn test_trim_trailing_idle() {
        let (recorder, source) = recorder();
        recorder.set_options(RecorderOptions {
            trim_trailing_idle: true,
            ..Default::default()
        });
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(0, 0));
        std::thread::sleep(Duration::from_millis(20));

        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(
            recording.duration_ns,
            recording.last_timestamp_ns().unwrap()
        );
    }

    #[test]
    fn test_untrimmed_duration_covers_idle_tail() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(0, 0));
        std::thread::sleep(Duration::from_millis(20));

        let recording = recorder.stop().unwrap().unwrap();
        assert!(recording.duration() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stop_when_idle_returns_none() {
        let (recorder, _source) = recorder();
        assert!(recorder.stop().unwrap().is_none());
        assert_eq!(recorder.duration(), Duration::ZERO);
    }

    #[test]
    fn test_start_twice_keeps_one_session() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(1, 2));
        assert_eq!(recorder.stop().unwrap().unwrap().len(), 1);
        assert!(recorder.stop().unwrap().is_none());
    }

    #[test]
    fn test_subscribe_failure_leaves_idle() {
        let (recorder, source) = recorder();
        source.set_available(false);

        let err = recorder.start().unwrap_err();
        assert!(matches!(err, MacroError::Capture { .. }));
        assert!(!recorder.is_recording());

        source.set_available(true);
        recorder.start().unwrap();
        assert!(recorder.is_recording());
    }

    /// Replays a burst of events from inside `subscribe`, like a hook that
    /// flushes its queue as soon as it is installed.
    struct BurstSource {
        sink: Mutex<Option<EventSink>>,
    }

    impl EventSource for BurstSource {
        fn subscribe(&self, sink: EventSink) -> MacroResult<()> {
            sink(EventKind::pointer_move(1, 1));
            sink(EventKind::key(0x41, 0, ButtonState::Down));
            *self.sink.lock() = Some(sink);
            Ok(())
        }

        fn unsubscribe(&self) -> MacroResult<()> {
            self.sink.lock().take();
            Ok(())
        }

        fn name(&self) -> &str {
            "burst"
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_events_delivered_during_subscribe_are_kept() {
        let source = Arc::new(BurstSource {
            sink: Mutex::new(None),
        });
        let recorder = Recorder::new(source);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        recorder.set_observer(Arc::new(move |event| sink.lock().push(event)));

        recorder.start().unwrap();
        assert_eq!(recorder.event_count(), 2);

        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 2);
        assert!(recording.validate().is_empty());

        let events = events.lock();
        let last = events.iter().max_by_key(|e| e.sequence).unwrap();
        assert!(!last.active);
        assert_eq!(last.count, 2);
    }

    #[test]
    fn test_subscribe_failure_clears_prepared_recording() {
        let (recorder, source) = recorder();
        source.set_available(false);
        assert!(recorder.start().is_err());
        assert_eq!(recorder.event_count(), 0);

        // A sink from the failed attempt must not record into a later session.
        source.set_available(true);
        recorder.start().unwrap();
        source.emit(EventKind::pointer_move(3, 3));
        assert_eq!(recorder.stop().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_events_after_stop_are_dropped() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();
        let recording = recorder.stop().unwrap().unwrap();
        assert!(recording.is_empty());

        assert!(!source.emit(EventKind::pointer_move(9, 9)));
        assert_eq!(recorder.event_count(), 0);
    }

    #[test]
    fn test_set_name_applies_to_current_recording() {
        let (recorder, _source) = recorder();
        recorder.start().unwrap();
        recorder.set_name("Login flow");
        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.name, "Login flow");
        assert_eq!(recorder.options().name, "Login flow");
    }

    #[test]
    fn test_concurrent_emitters_keep_order() {
        let (recorder, source) = recorder();
        recorder.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let source = source.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        source.emit(EventKind::pointer_move(i, j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let recording = recorder.stop().unwrap().unwrap();
        assert_eq!(recording.len(), 200);
        assert!(recording.validate().is_empty());
    }
}
