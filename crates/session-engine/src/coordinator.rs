//! Session coordinator.
//!
//! Owns the auto-clicker, recorder and player and lets at most one of them
//! run at a time. Hotkeys and front-ends go through this type rather than
//! the sessions directly.
//!
//! Lock order is coordinator state first, then a session lock. Each session
//! announces its own transitions through a per-session observer that only
//! publishes to the [`Notifier`] and never takes the coordinator lock.
//!
//! The sessions themselves stay private so every start goes through the
//! busy check.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use macrokit_common::config::AppConfig;
use macrokit_common::error::{MacroError, MacroResult};
use macrokit_input_bridge::{Actuator, EventSource};
use macrokit_recording_model::recording::Recording;
use macrokit_recording_model::storage::{RecordingStorage, StorageError};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::autoclicker::{AutoClicker, ClickerState};
use crate::config::{is_valid_speed, AutoClickerConfig, LoopMode, PlaybackConfig, RecorderOptions};
use crate::notify::{Notifier, SessionKind, StateEvent};
use crate::player::{PlaybackProgress, Player, PlayerState};
use crate::recorder::{Recorder, RecorderState};

/// Actions bound to global hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    AutoClicker,
    Record,
    Playback,
    Stop,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 4] = [
        HotkeyAction::AutoClicker,
        HotkeyAction::Record,
        HotkeyAction::Playback,
        HotkeyAction::Stop,
    ];

    /// Pair each action with its configured key name.
    pub fn bindings(config: &AppConfig) -> Vec<(HotkeyAction, String)> {
        Self::ALL
            .iter()
            .zip(config.hotkeys.keys())
            .map(|(action, key)| (*action, key.to_string()))
            .collect()
    }
}

struct CoordinatorState {
    current: Option<Arc<Recording>>,
    current_path: Option<PathBuf>,
    playback: PlaybackConfig,
}

/// Serializes control of the three sessions.
pub struct Coordinator {
    autoclicker: AutoClicker,
    recorder: Recorder,
    player: Player,
    storage: Arc<dyn RecordingStorage>,
    notifier: Notifier,
    state: Mutex<CoordinatorState>,
}

impl Coordinator {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        source: Arc<dyn EventSource>,
        storage: Arc<dyn RecordingStorage>,
        runtime: Handle,
    ) -> Self {
        let notifier = Notifier::new();

        let autoclicker = AutoClicker::new(actuator.clone(), runtime.clone());
        autoclicker.set_observer(notifier.observer());
        let recorder = Recorder::new(source);
        recorder.set_observer(notifier.observer());
        let player = Player::new(actuator, runtime);
        player.set_observer(notifier.observer());

        Self {
            autoclicker,
            recorder,
            player,
            storage,
            notifier,
            state: Mutex::new(CoordinatorState {
                current: None,
                current_path: None,
                playback: PlaybackConfig::default(),
            }),
        }
    }

    /// Apply persisted clicker and playback settings.
    ///
    /// Nothing is changed unless both sections are valid.
    pub fn apply_settings(&self, config: &AppConfig) -> MacroResult<()> {
        let clicker = AutoClickerConfig::try_from(&config.clicker)?;
        let playback = PlaybackConfig::try_from(&config.playback)?;
        self.autoclicker.set_config(clicker)?;
        self.state.lock().playback = playback;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.notifier.subscribe()
    }

    pub fn autoclicker_state(&self) -> ClickerState {
        self.autoclicker.state()
    }

    /// Clicks performed by the current (or last) auto-clicker run.
    pub fn click_count(&self) -> u64 {
        self.autoclicker.click_count()
    }

    pub fn autoclicker_config(&self) -> AutoClickerConfig {
        self.autoclicker.config()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn recorder_options(&self) -> RecorderOptions {
        self.recorder.options()
    }

    /// Events captured so far by the recording in progress.
    pub fn recorded_event_count(&self) -> usize {
        self.recorder.event_count()
    }

    pub fn recording_duration(&self) -> Duration {
        self.recorder.duration()
    }

    pub fn player_state(&self) -> PlayerState {
        self.player.state()
    }

    pub fn playback_progress(&self) -> PlaybackProgress {
        self.player.progress()
    }

    /// The session currently running, if any.
    pub fn active_session(&self) -> Option<SessionKind> {
        if self.autoclicker.is_running() {
            Some(SessionKind::AutoClicker)
        } else if self.recorder.is_recording() {
            Some(SessionKind::Recorder)
        } else if self.player.is_active() {
            Some(SessionKind::Player)
        } else {
            None
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_session().is_none()
    }

    fn ensure_free(&self, wanted: SessionKind) -> MacroResult<()> {
        match self.active_session() {
            Some(active) if active != wanted => Err(MacroError::busy(format!(
                "cannot start {} while {} is active",
                wanted.as_str(),
                active.as_str()
            ))),
            _ => Ok(()),
        }
    }

    /// Start or stop the auto-clicker. Returns whether it is now running.
    pub fn toggle_autoclicker(&self) -> MacroResult<bool> {
        let _state = self.state.lock();
        if self.autoclicker.is_running() {
            self.autoclicker.stop();
            return Ok(false);
        }

        self.ensure_free(SessionKind::AutoClicker)?;
        self.autoclicker.start();
        Ok(true)
    }

    /// Start or stop recording. Returns whether it is now recording.
    ///
    /// Stopping makes the new recording the current one.
    pub fn toggle_recording(&self) -> MacroResult<bool> {
        let mut state = self.state.lock();
        if self.recorder.is_recording() {
            self.stop_recorder(&mut state)?;
            return Ok(false);
        }

        self.ensure_free(SessionKind::Recorder)?;
        self.recorder.start()?;
        Ok(true)
    }

    /// Start or stop playback of the current recording.
    ///
    /// Returns whether playback is now active.
    pub fn toggle_playback(&self) -> MacroResult<bool> {
        let state = self.state.lock();
        if self.player.is_active() {
            self.player.stop();
            return Ok(false);
        }

        self.ensure_free(SessionKind::Player)?;
        let recording = state.current.clone().ok_or(MacroError::NoRecording)?;
        if recording.is_empty() {
            return Err(MacroError::validation("recording has no events"));
        }

        self.player.play(recording, state.playback);
        Ok(true)
    }

    /// Pause playback. Returns `false` unless it was playing.
    pub fn pause_playback(&self) -> bool {
        let _state = self.state.lock();
        self.player.pause()
    }

    /// Resume playback. Returns `false` unless it was paused.
    pub fn resume_playback(&self) -> bool {
        let _state = self.state.lock();
        self.player.resume()
    }

    /// Stop whichever session is active and report which one it was.
    pub fn stop(&self) -> MacroResult<Option<SessionKind>> {
        let mut state = self.state.lock();
        let stopped = match self.active_session() {
            Some(SessionKind::AutoClicker) => {
                self.autoclicker.stop();
                Some(SessionKind::AutoClicker)
            }
            Some(SessionKind::Recorder) => {
                self.stop_recorder(&mut state)?;
                Some(SessionKind::Recorder)
            }
            Some(SessionKind::Player) => {
                self.player.stop();
                Some(SessionKind::Player)
            }
            None => None,
        };
        Ok(stopped)
    }

    /// Stop every session, keeping whatever the recorder captured.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        self.autoclicker.stop();
        if let Err(e) = self.stop_recorder(&mut state) {
            tracing::warn!(error = %e, "Recorder did not stop cleanly during shutdown");
        }
        self.player.stop();
        tracing::info!("Coordinator shut down");
    }

    /// Entry point for the hotkey layer.
    pub fn trigger(&self, action: HotkeyAction) -> MacroResult<()> {
        tracing::debug!(?action, "Hotkey triggered");
        match action {
            HotkeyAction::AutoClicker => self.toggle_autoclicker().map(|_| ()),
            HotkeyAction::Record => self.toggle_recording().map(|_| ()),
            HotkeyAction::Playback => self.toggle_playback().map(|_| ()),
            HotkeyAction::Stop => self.stop().map(|_| ()),
        }
    }

    fn stop_recorder(&self, state: &mut CoordinatorState) -> MacroResult<()> {
        if let Some(recording) = self.recorder.stop()? {
            state.current = Some(Arc::new(recording));
            state.current_path = None;
        }
        Ok(())
    }

    pub fn current_recording(&self) -> Option<Arc<Recording>> {
        self.state.lock().current.clone()
    }

    pub fn current_file_path(&self) -> Option<PathBuf> {
        self.state.lock().current_path.clone()
    }

    pub fn has_recording(&self) -> bool {
        self.state.lock().current.is_some()
    }

    /// Make `recording` current. Rejected unless every session is idle.
    pub fn set_recording(&self, recording: Recording) -> MacroResult<()> {
        let mut state = self.state.lock();
        if !self.is_idle() {
            return Err(MacroError::busy("cannot replace the recording while a session is active"));
        }
        state.current = Some(Arc::new(recording));
        state.current_path = None;
        Ok(())
    }

    /// Save the current recording, returning the path written.
    pub fn save_recording(&self, path: impl AsRef<Path>) -> MacroResult<PathBuf> {
        let mut state = self.state.lock();
        let recording = state.current.clone().ok_or(MacroError::NoRecording)?;
        let written = self
            .storage
            .save(&recording, path.as_ref())
            .map_err(storage_error)?;
        tracing::info!(path = %written.display(), events = recording.len(), "Recording saved");
        state.current_path = Some(written.clone());
        Ok(written)
    }

    /// Load a recording from disk and make it current.
    pub fn load_recording(&self, path: impl AsRef<Path>) -> MacroResult<Arc<Recording>> {
        let mut state = self.state.lock();
        if !self.is_idle() {
            return Err(MacroError::busy("cannot load a recording while a session is active"));
        }
        let path = path.as_ref();
        let recording = Arc::new(self.storage.load(path).map_err(storage_error)?);
        tracing::info!(path = %path.display(), events = recording.len(), "Recording loaded");
        state.current = Some(recording.clone());
        state.current_path = Some(path.to_path_buf());
        Ok(recording)
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        self.state.lock().playback
    }

    /// Set the speed used by the next playback.
    pub fn set_playback_speed(&self, speed: f64) -> MacroResult<()> {
        if !is_valid_speed(speed) {
            return Err(MacroError::validation(format!(
                "playback speed must be positive and finite, got {speed}"
            )));
        }
        self.state.lock().playback.speed = speed;
        Ok(())
    }

    /// Set the loop mode used by the next playback.
    pub fn set_playback_loop(&self, loop_mode: LoopMode) -> MacroResult<()> {
        let candidate = PlaybackConfig {
            loop_mode,
            ..self.playback_config()
        };
        candidate.validate()?;
        self.state.lock().playback.loop_mode = loop_mode;
        Ok(())
    }

    pub fn set_autoclicker_config(&self, config: AutoClickerConfig) -> MacroResult<()> {
        self.autoclicker.set_config(config)
    }

    pub fn set_recorder_options(&self, options: RecorderOptions) {
        self.recorder.set_options(options);
    }
}

fn storage_error(err: StorageError) -> MacroError {
    match err {
        StorageError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
            MacroError::FileNotFound { path }
        }
        other => MacroError::storage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrokit_input_bridge::{ManualEventSource, MemoryActuator};
    use macrokit_recording_model::event::{EventKind, InputEvent};
    use macrokit_recording_model::storage::JsonStorage;

    struct Fixture {
        coordinator: Coordinator,
        actuator: Arc<MemoryActuator>,
        source: Arc<ManualEventSource>,
    }

    fn fixture() -> Fixture {
        let actuator = Arc::new(MemoryActuator::new());
        let source = Arc::new(ManualEventSource::new());
        let coordinator = Coordinator::new(
            actuator.clone(),
            source.clone(),
            Arc::new(JsonStorage::new()),
            Handle::current(),
        );
        Fixture {
            coordinator,
            actuator,
            source,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_only_one_session_at_a_time() {
        let f = fixture();
        assert!(f.coordinator.toggle_recording().unwrap());

        let err = f.coordinator.toggle_autoclicker().unwrap_err();
        assert!(err.is_busy());
        let err = f.coordinator.toggle_playback().unwrap_err();
        assert!(err.is_busy());
        assert_eq!(f.coordinator.active_session(), Some(SessionKind::Recorder));

        assert_eq!(f.coordinator.stop().unwrap(), Some(SessionKind::Recorder));
        assert!(f.coordinator.is_idle());
        assert_eq!(f.actuator.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queries_follow_the_active_session() {
        let f = fixture();
        let mut rx = f.coordinator.subscribe();
        f.coordinator.toggle_recording().unwrap();
        f.source.emit(EventKind::pointer_move(1, 2));

        assert_eq!(f.coordinator.recorder_state(), RecorderState::Recording);
        assert_eq!(f.coordinator.recorded_event_count(), 1);
        assert_eq!(f.coordinator.autoclicker_state(), ClickerState::Stopped);
        assert_eq!(f.coordinator.player_state(), PlayerState::Idle);

        f.coordinator.toggle_recording().unwrap();
        assert_eq!(f.coordinator.recorder_state(), RecorderState::Idle);
        assert_eq!(f.coordinator.recording_duration(), Duration::ZERO);

        // Started, captured one event, stopped.
        let events: Vec<StateEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let flags: Vec<bool> = events.iter().map(|e| e.active).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(events[2].count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_playback_requires_recording() {
        let f = fixture();
        assert!(matches!(
            f.coordinator.toggle_playback(),
            Err(MacroError::NoRecording)
        ));

        f.coordinator.set_recording(Recording::new("empty")).unwrap();
        assert!(matches!(
            f.coordinator.toggle_playback(),
            Err(MacroError::Validation { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stopping_recorder_makes_recording_current() {
        let f = fixture();
        f.coordinator.trigger(HotkeyAction::Record).unwrap();
        f.source.emit(EventKind::pointer_move(3, 4));
        f.coordinator.trigger(HotkeyAction::Record).unwrap();

        let current = f.coordinator.current_recording().unwrap();
        assert_eq!(current.len(), 1);
        assert!(f.coordinator.current_file_path().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_playback_settings_validation() {
        let f = fixture();
        assert!(f.coordinator.set_playback_speed(0.0).is_err());
        assert!(f.coordinator.set_playback_speed(f64::NAN).is_err());
        f.coordinator.set_playback_speed(2.0).unwrap();
        assert!(f.coordinator.set_playback_loop(LoopMode::Count(0)).is_err());
        f.coordinator.set_playback_loop(LoopMode::Count(2)).unwrap();

        let config = f.coordinator.playback_config();
        assert_eq!(config.speed, 2.0);
        assert_eq!(config.loop_mode, LoopMode::Count(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_apply_settings_is_all_or_nothing() {
        let f = fixture();
        let mut config = AppConfig::default();
        config.clicker.interval_ms = 50;
        config.playback.speed = "bogus".to_string();
        assert!(f.coordinator.apply_settings(&config).is_err());
        assert_eq!(f.coordinator.autoclicker_config().interval, Duration::from_secs(1));

        config.playback.speed = "2x".to_string();
        f.coordinator.apply_settings(&config).unwrap();
        assert_eq!(f.coordinator.autoclicker_config().interval, Duration::from_millis(50));
        assert_eq!(f.coordinator.playback_config().speed, 2.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_missing_file_maps_to_not_found() {
        let f = fixture();
        let err = f
            .coordinator
            .load_recording("/nonexistent/macrokit/none.mkmacro")
            .unwrap_err();
        assert!(matches!(err, MacroError::FileNotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_without_recording_fails() {
        let f = fixture();
        let err = f
            .coordinator
            .save_recording(std::env::temp_dir().join("macrokit_never_written"))
            .unwrap_err();
        assert!(matches!(err, MacroError::NoRecording));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_rejected_while_busy() {
        let f = fixture();
        let mut recording = Recording::new("one");
        recording.add_event(InputEvent::pointer_move(0, 0, 0));
        f.coordinator.set_recording(recording).unwrap();

        f.coordinator.toggle_recording().unwrap();
        let err = f.coordinator.load_recording("whatever").unwrap_err();
        assert!(err.is_busy());
        assert!(f
            .coordinator
            .set_recording(Recording::new("two"))
            .unwrap_err()
            .is_busy());
        f.coordinator.shutdown();
        assert!(f.coordinator.is_idle());
    }

    #[test]
    fn test_hotkey_bindings_follow_settings() {
        let config = AppConfig::default();
        let bindings = HotkeyAction::bindings(&config);
        assert_eq!(bindings[0], (HotkeyAction::AutoClicker, "F6".to_string()));
        assert_eq!(bindings[3], (HotkeyAction::Stop, "F11".to_string()));
    }
}
