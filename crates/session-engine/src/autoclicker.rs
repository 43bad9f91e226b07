//! Auto-clicker session.
//!
//! Clicks on a jittered cadence until stopped or until a click count is
//! reached. The click and the counter update happen under the session lock
//! after the loop confirms its activation is still current, so no click can
//! land after [`AutoClicker::stop`] returns.

use std::sync::Arc;

use macrokit_common::error::MacroResult;
use macrokit_input_bridge::Actuator;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;

use crate::config::{jittered_delay, AutoClickerConfig, ClickPosition, RepeatMode};
use crate::notify::{Announcer, Notice, SessionKind, StateEvent, StateObserver};
use crate::signal::{Activation, CancelToken};

/// State of the auto-clicker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickerState {
    Stopped,
    Running,
}

struct Inner {
    state: ClickerState,
    config: AutoClickerConfig,
    click_count: u64,
    generation: u64,
    activation: Option<Activation>,
    announcer: Announcer,
}

impl Inner {
    fn notice(&mut self, active: bool) -> Option<Notice> {
        let event = StateEvent::new(SessionKind::AutoClicker, active).with_count(self.click_count);
        self.announcer.notice(event, self.generation)
    }
}

struct Shared {
    actuator: Arc<dyn Actuator>,
    inner: Mutex<Inner>,
}

/// A repeating click session.
pub struct AutoClicker {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl AutoClicker {
    /// Create a stopped auto-clicker with the default config.
    pub fn new(actuator: Arc<dyn Actuator>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                actuator,
                inner: Mutex::new(Inner {
                    state: ClickerState::Stopped,
                    config: AutoClickerConfig::default(),
                    click_count: 0,
                    generation: 0,
                    activation: None,
                    announcer: Announcer::default(),
                }),
            }),
            runtime,
        }
    }

    /// Install the callback that receives click and stop notifications.
    pub fn set_observer(&self, observer: StateObserver) {
        self.shared.inner.lock().announcer.set_observer(observer);
    }

    pub fn state(&self) -> ClickerState {
        self.shared.inner.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == ClickerState::Running
    }

    /// Clicks performed by the current (or last) run.
    pub fn click_count(&self) -> u64 {
        self.shared.inner.lock().click_count
    }

    pub fn config(&self) -> AutoClickerConfig {
        self.shared.inner.lock().config.clone()
    }

    /// Replace the config used by the next start.
    ///
    /// A running loop keeps the config it was started with.
    pub fn set_config(&self, config: AutoClickerConfig) -> MacroResult<()> {
        config.validate()?;
        self.shared.inner.lock().config = config;
        Ok(())
    }

    /// Start clicking. Does nothing if already running.
    pub fn start(&self) {
        let (token, config, notice) = {
            let mut inner = self.shared.inner.lock();
            if inner.state == ClickerState::Running {
                return;
            }
            inner.generation += 1;
            let activation = Activation::new(inner.generation);
            let token = activation.token();
            inner.activation = Some(activation);
            inner.state = ClickerState::Running;
            inner.click_count = 0;
            let notice = inner.notice(true);
            (token, inner.config.clone(), notice)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }

        tracing::info!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_ms = config.jitter.as_millis() as u64,
            button = config.button.as_str(),
            generation = token.generation(),
            "Auto-clicker started"
        );
        self.runtime.spawn(click_loop(self.shared.clone(), token, config));
    }

    /// Stop clicking. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let notice = {
            let mut inner = self.shared.inner.lock();
            if inner.state == ClickerState::Stopped {
                return false;
            }
            inner.state = ClickerState::Stopped;
            if let Some(activation) = inner.activation.take() {
                activation.cancel();
            }
            tracing::info!(clicks = inner.click_count, "Auto-clicker stopped");
            inner.notice(false)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        true
    }

    /// Stop if running, start otherwise. Returns whether it is now running.
    pub fn toggle(&self) -> bool {
        if self.stop() {
            false
        } else {
            self.start();
            true
        }
    }
}

impl Drop for AutoClicker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn click_loop(shared: Arc<Shared>, token: CancelToken, config: AutoClickerConfig) {
    let mut rng = StdRng::from_entropy();

    loop {
        if token.is_cancelled() {
            return;
        }

        let (count, finished, notices) = {
            let mut inner = shared.inner.lock();
            if inner.generation != token.generation() || inner.state != ClickerState::Running {
                return;
            }

            if let ClickPosition::Fixed { x, y } = config.position {
                shared.actuator.move_to(x, y);
            }
            shared.actuator.click(config.button, config.click_type);
            inner.click_count += 1;

            let count = inner.click_count;
            let finished = matches!(config.repeat, RepeatMode::Count(n) if count >= u64::from(n));
            let mut notices = vec![inner.notice(true)];
            if finished {
                inner.state = ClickerState::Stopped;
                inner.activation = None;
                notices.push(inner.notice(false));
            }
            (count, finished, notices)
        };

        for notice in notices.into_iter().flatten() {
            notice.deliver();
        }

        if finished {
            tracing::info!(clicks = count, "Auto-clicker reached its click count");
            return;
        }

        let delay = jittered_delay(&config, &mut rng);
        if !token.sleep(delay).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrokit_common::error::MacroError;
    use macrokit_input_bridge::{ActuatorCall, MemoryActuator};
    use std::time::Duration;

    fn clicker(interval_ms: u64) -> (AutoClicker, Arc<MemoryActuator>) {
        let actuator = Arc::new(MemoryActuator::new());
        let clicker = AutoClicker::new(actuator.clone(), Handle::current());
        clicker
            .set_config(AutoClickerConfig {
                interval: Duration::from_millis(interval_ms),
                ..Default::default()
            })
            .unwrap();
        (clicker, actuator)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_clicks_until_stop() {
        let (clicker, actuator) = clicker(10);
        clicker.start();
        assert!(clicker.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(clicker.stop());
        let after_stop = actuator.click_count();
        assert!(after_stop >= 1);
        assert_eq!(clicker.click_count(), after_stop as u64);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(actuator.click_count(), after_stop);
        assert_eq!(clicker.state(), ClickerState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_count_mode_self_stops() {
        let (clicker, actuator) = clicker(5);
        clicker
            .set_config(AutoClickerConfig {
                interval: Duration::from_millis(5),
                repeat: RepeatMode::Count(3),
                ..Default::default()
            })
            .unwrap();

        clicker.start();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!clicker.is_running());
        assert_eq!(clicker.click_count(), 3);
        assert_eq!(actuator.click_count(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fixed_position_moves_before_click() {
        let (clicker, actuator) = clicker(5);
        clicker
            .set_config(AutoClickerConfig {
                interval: Duration::from_millis(5),
                repeat: RepeatMode::Count(1),
                position: ClickPosition::Fixed { x: 40, y: 50 },
                ..Default::default()
            })
            .unwrap();

        clicker.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = actuator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ActuatorCall::Move { x: 40, y: 50 });
        assert!(matches!(calls[1], ActuatorCall::Click { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_and_stop_are_idempotent() {
        let (clicker, actuator) = clicker(1000);
        clicker.start();
        clicker.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        // One loop, one immediate click.
        assert_eq!(actuator.click_count(), 1);

        assert!(clicker.stop());
        assert!(!clicker.stop());
        assert!(!clicker.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_restart_resets_count() {
        let (clicker, _actuator) = clicker(5);
        clicker.start();
        tokio::time::sleep(Duration::from_millis(40)).await;
        clicker.stop();
        assert!(clicker.click_count() >= 2);

        clicker
            .set_config(AutoClickerConfig {
                interval: Duration::from_secs(10),
                ..Default::default()
            })
            .unwrap();
        clicker.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(clicker.click_count(), 1);
        clicker.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_config_rejects_invalid_and_keeps_previous() {
        let (clicker, _actuator) = clicker(25);
        let err = clicker
            .set_config(AutoClickerConfig {
                interval: Duration::ZERO,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, MacroError::Validation { .. }));
        assert_eq!(clicker.config().interval, Duration::from_millis(25));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_observer_sees_clicks_and_self_stop() {
        let (clicker, _actuator) = clicker(5);
        clicker
            .set_config(AutoClickerConfig {
                interval: Duration::from_millis(5),
                repeat: RepeatMode::Count(2),
                ..Default::default()
            })
            .unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        clicker.set_observer(Arc::new(move |event| sink.lock().push(event)));

        clicker.start();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert!(events[0].active && events[0].count == 0);
        assert!(events[1].active && events[1].count == 1);
        assert!(events[2].active && events[2].count == 2);
        assert!(!events[3].active && events[3].count == 2);
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert!(events.iter().all(|e| e.generation == 1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_event_is_sequenced_after_clicks() {
        let (clicker, _actuator) = clicker(2);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        clicker.set_observer(Arc::new(move |event| sink.lock().push(event)));

        clicker.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(clicker.stop());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = events.lock();
        let last = events.iter().max_by_key(|e| e.sequence).unwrap();
        assert!(!last.active);
        assert_eq!(last.count, clicker.click_count());
    }
}
