//! Macro playback session.
//!
//! Replays a recording's events in order, waiting the recorded gap between
//! consecutive events divided by the speed factor. The first event of each
//! pass runs immediately.
//!
//! The loop checks for a pause before each event's delay, and the locked
//! execute step refuses to run while paused. A pause that arrives during a
//! delay lets the delay finish; the event then waits for resume and runs
//! exactly once.

use std::sync::Arc;

use macrokit_input_bridge::{Actuator, ScrollDirection};
use macrokit_recording_model::event::{ButtonState, EventKind, InputEvent, TimestampNs};
use macrokit_recording_model::recording::Recording;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::{scaled_delay, PlaybackConfig};
use crate::notify::{Announcer, Notice, SessionKind, StateEvent, StateObserver};
use crate::signal::{Activation, CancelToken};

/// State of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

/// Position of the player within the loaded recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackProgress {
    /// Events executed in the current pass.
    pub current_event: usize,
    pub total_events: usize,
    /// Current pass, 1-based; 0 before the first play.
    pub current_loop: u32,
}

struct PlaybackControl {
    activation: Activation,
    pause_tx: watch::Sender<bool>,
}

struct Inner {
    state: PlayerState,
    recording: Option<Arc<Recording>>,
    config: PlaybackConfig,
    current_index: usize,
    current_loop: u32,
    generation: u64,
    control: Option<PlaybackControl>,
    announcer: Announcer,
}

impl Inner {
    fn progress(&self) -> PlaybackProgress {
        PlaybackProgress {
            current_event: self.current_index,
            total_events: self.recording.as_ref().map_or(0, |r| r.len()),
            current_loop: self.current_loop,
        }
    }

    fn notice(&mut self, active: bool) -> Option<Notice> {
        let progress = self.progress();
        let event = StateEvent::new(SessionKind::Player, active).with_progress(
            progress.current_event,
            progress.total_events,
            progress.current_loop,
        );
        self.announcer.notice(event, self.generation)
    }
}

struct Shared {
    actuator: Arc<dyn Actuator>,
    inner: Mutex<Inner>,
}

/// A macro playback session.
pub struct Player {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl Player {
    pub fn new(actuator: Arc<dyn Actuator>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                actuator,
                inner: Mutex::new(Inner {
                    state: PlayerState::Idle,
                    recording: None,
                    config: PlaybackConfig::default(),
                    current_index: 0,
                    current_loop: 0,
                    generation: 0,
                    control: None,
                    announcer: Announcer::default(),
                }),
            }),
            runtime,
        }
    }

    /// Install the callback that receives progress and completion notifications.
    pub fn set_observer(&self, observer: StateObserver) {
        self.shared.inner.lock().announcer.set_observer(observer);
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().state
    }

    /// Whether playing or paused.
    pub fn is_active(&self) -> bool {
        self.state() != PlayerState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlayerState::Paused
    }

    pub fn progress(&self) -> PlaybackProgress {
        self.shared.inner.lock().progress()
    }

    /// Config of the current (or last) playback, after normalization.
    pub fn config(&self) -> PlaybackConfig {
        self.shared.inner.lock().config
    }

    /// Start playing `recording` from its first event.
    ///
    /// Does nothing if already playing. A paused playback is abandoned and
    /// replaced by the new one.
    pub fn play(&self, recording: Arc<Recording>, config: PlaybackConfig) {
        let config = config.normalized();
        let (token, pause_rx, notice) = {
            let mut inner = self.shared.inner.lock();
            if inner.state == PlayerState::Playing {
                return;
            }
            if let Some(control) = inner.control.take() {
                control.activation.cancel();
            }

            inner.generation += 1;
            let activation = Activation::new(inner.generation);
            let token = activation.token();
            let (pause_tx, pause_rx) = watch::channel(false);
            inner.control = Some(PlaybackControl {
                activation,
                pause_tx,
            });
            inner.recording = Some(recording.clone());
            inner.config = config;
            inner.current_index = 0;
            inner.current_loop = 1;
            inner.state = PlayerState::Playing;
            let notice = inner.notice(true);
            (token, pause_rx, notice)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }

        tracing::info!(
            name = %recording.name,
            events = recording.len(),
            speed = config.speed,
            loop_mode = ?config.loop_mode,
            generation = token.generation(),
            "Playback started"
        );
        self.runtime.spawn(playback_loop(
            self.shared.clone(),
            token,
            pause_rx,
            recording,
            config,
        ));
    }

    /// Pause a running playback. Returns `false` unless it was playing.
    pub fn pause(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.state != PlayerState::Playing {
            return false;
        }
        inner.state = PlayerState::Paused;
        if let Some(control) = inner.control.as_ref() {
            control.pause_tx.send_replace(true);
        }
        tracing::info!(event = inner.current_index, "Playback paused");
        true
    }

    /// Resume a paused playback. Returns `false` unless it was paused.
    pub fn resume(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.state != PlayerState::Paused {
            return false;
        }
        inner.state = PlayerState::Playing;
        if let Some(control) = inner.control.as_ref() {
            control.pause_tx.send_replace(false);
        }
        tracing::info!(event = inner.current_index, "Playback resumed");
        true
    }

    /// Stop playback. Returns `false` if it was idle.
    pub fn stop(&self) -> bool {
        let notice = {
            let mut inner = self.shared.inner.lock();
            if inner.state == PlayerState::Idle {
                return false;
            }
            inner.state = PlayerState::Idle;
            if let Some(control) = inner.control.take() {
                control.activation.cancel();
            }
            tracing::info!(
                event = inner.current_index,
                loop_index = inner.current_loop,
                "Playback stopped"
            );
            inner.notice(false)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        true
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Step {
    Executed,
    Paused,
    Stale,
}

async fn playback_loop(
    shared: Arc<Shared>,
    token: CancelToken,
    mut pause_rx: watch::Receiver<bool>,
    recording: Arc<Recording>,
    config: PlaybackConfig,
) {
    let mut loop_index = 1u32;
    while !recording.is_empty() && config.loop_mode.should_play(loop_index) {
        if !play_pass(&shared, &token, &mut pause_rx, &recording, config.speed, loop_index).await
        {
            return;
        }

        loop_index = loop_index.saturating_add(1);
        if config.loop_mode.should_play(loop_index) {
            let mut inner = shared.inner.lock();
            if inner.generation != token.generation() {
                return;
            }
            inner.current_loop = loop_index;
            inner.current_index = 0;
            tracing::debug!(loop_index, "Starting next pass");
        }
        // A pass with no gaps never awaits.
        tokio::task::yield_now().await;
    }

    let (progress, notice) = {
        let mut inner = shared.inner.lock();
        if inner.generation != token.generation() || inner.state == PlayerState::Idle {
            return;
        }
        inner.state = PlayerState::Idle;
        inner.control = None;
        (inner.progress(), inner.notice(false))
    };

    tracing::info!(
        events = progress.total_events,
        loops = progress.current_loop,
        "Playback finished"
    );
    if let Some(notice) = notice {
        notice.deliver();
    }
}

/// Play every event once. Returns `false` if the activation ended midway.
async fn play_pass(
    shared: &Shared,
    token: &CancelToken,
    pause_rx: &mut watch::Receiver<bool>,
    recording: &Recording,
    speed: f64,
    loop_index: u32,
) -> bool {
    let mut previous: Option<TimestampNs> = None;

    for (index, event) in recording.events.iter().enumerate() {
        if !wait_if_paused(token, pause_rx).await {
            return false;
        }

        if let Some(previous) = previous {
            let delay = scaled_delay(previous, event.timestamp_ns, speed);
            if !delay.is_zero() && !token.sleep(delay).await {
                return false;
            }
        }
        previous = Some(event.timestamp_ns);

        loop {
            match execute(shared, token, event, index, loop_index) {
                Step::Executed => break,
                Step::Stale => return false,
                Step::Paused => {
                    if !wait_if_paused(token, pause_rx).await {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Block while paused. Returns `false` if the activation ended instead.
async fn wait_if_paused(token: &CancelToken, pause_rx: &mut watch::Receiver<bool>) -> bool {
    if token.is_cancelled() {
        return false;
    }
    let paused = *pause_rx.borrow();
    if !paused {
        return true;
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        resumed = async { pause_rx.wait_for(|paused| !*paused).await.is_ok() } => {
            resumed && !token.is_cancelled()
        }
    }
}

fn execute(
    shared: &Shared,
    token: &CancelToken,
    event: &InputEvent,
    index: usize,
    loop_index: u32,
) -> Step {
    let notice = {
        let mut inner = shared.inner.lock();
        if inner.generation != token.generation() {
            return Step::Stale;
        }
        match inner.state {
            PlayerState::Idle => return Step::Stale,
            PlayerState::Paused => return Step::Paused,
            PlayerState::Playing => {}
        }

        dispatch(shared.actuator.as_ref(), &event.kind);
        inner.current_index = index + 1;
        inner.current_loop = loop_index;
        inner.notice(true)
    };

    if let Some(notice) = notice {
        notice.deliver();
    }
    Step::Executed
}

fn dispatch(actuator: &dyn Actuator, kind: &EventKind) {
    match *kind {
        EventKind::PointerMove { x, y } => actuator.move_to(x, y),
        EventKind::Button {
            button,
            state,
            x,
            y,
        } => {
            actuator.move_to(x, y);
            actuator.toggle_button(button, state);
        }
        EventKind::Scroll { delta, .. } => {
            let direction = if delta > 0 {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            actuator.scroll(delta.saturating_abs(), direction);
        }
        EventKind::Key {
            key_code, state, ..
        } => match state {
            ButtonState::Down => actuator.key_down(key_code),
            ButtonState::Up => actuator.key_up(key_code),
        },
    }
}
