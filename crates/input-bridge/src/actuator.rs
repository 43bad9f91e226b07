//! Pointer and keyboard synthesis.

use std::time::Instant;

use macrokit_recording_model::event::{ButtonState, ClickType, MouseButton};
use parking_lot::Mutex;

/// Wheel direction for synthesized scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Trait for input synthesis backends.
///
/// Calls are fire-and-forget: a backend that fails to inject an event logs
/// the failure itself. Implementations must not call back into the session
/// that drives them.
pub trait Actuator: Send + Sync {
    /// Move the pointer to an absolute screen position.
    fn move_to(&self, x: i32, y: i32);

    /// Click at the current pointer position.
    fn click(&self, button: MouseButton, click_type: ClickType);

    /// Press or release a mouse button.
    fn toggle_button(&self, button: MouseButton, state: ButtonState);

    /// Scroll the wheel by `amount` notches.
    fn scroll(&self, amount: i32, direction: ScrollDirection);

    /// Press a key by virtual key code.
    fn key_down(&self, code: u16);

    /// Release a key by virtual key code.
    fn key_up(&self, code: u16);

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Logs every call instead of injecting input.
#[derive(Debug, Default)]
pub struct TracingActuator;

impl TracingActuator {
    pub fn new() -> Self {
        Self
    }
}

impl Actuator for TracingActuator {
    fn move_to(&self, x: i32, y: i32) {
        tracing::debug!(x, y, "move");
    }

    fn click(&self, button: MouseButton, click_type: ClickType) {
        tracing::debug!(
            button = button.as_str(),
            click_type = click_type.as_str(),
            "click"
        );
    }

    fn toggle_button(&self, button: MouseButton, state: ButtonState) {
        tracing::debug!(button = button.as_str(), ?state, "button");
    }

    fn scroll(&self, amount: i32, direction: ScrollDirection) {
        tracing::debug!(amount, ?direction, "scroll");
    }

    fn key_down(&self, code: u16) {
        tracing::debug!(code, "key down");
    }

    fn key_up(&self, code: u16) {
        tracing::debug!(code, "key up");
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// A single actuator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Move { x: i32, y: i32 },
    Click { button: MouseButton, click_type: ClickType },
    Button { button: MouseButton, state: ButtonState },
    Scroll { amount: i32, direction: ScrollDirection },
    KeyDown { code: u16 },
    KeyUp { code: u16 },
}

/// Records every call with the instant it happened.
#[derive(Debug, Default)]
pub struct MemoryActuator {
    calls: Mutex<Vec<(Instant, ActuatorCall)>>,
}

impl MemoryActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls in invocation order.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().iter().map(|(_, call)| *call).collect()
    }

    /// All calls paired with the instant they were made.
    pub fn timed_calls(&self) -> Vec<(Instant, ActuatorCall)> {
        self.calls.lock().clone()
    }

    /// Number of calls recorded so far.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Number of `click` calls recorded so far.
    pub fn click_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, call)| matches!(call, ActuatorCall::Click { .. }))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: ActuatorCall) {
        self.calls.lock().push((Instant::now(), call));
    }
}

impl Actuator for MemoryActuator {
    fn move_to(&self, x: i32, y: i32) {
        self.push(ActuatorCall::Move { x, y });
    }

    fn click(&self, button: MouseButton, click_type: ClickType) {
        self.push(ActuatorCall::Click { button, click_type });
    }

    fn toggle_button(&self, button: MouseButton, state: ButtonState) {
        self.push(ActuatorCall::Button { button, state });
    }

    fn scroll(&self, amount: i32, direction: ScrollDirection) {
        self.push(ActuatorCall::Scroll { amount, direction });
    }

    fn key_down(&self, code: u16) {
        self.push(ActuatorCall::KeyDown { code });
    }

    fn key_up(&self, code: u16) {
        self.push(ActuatorCall::KeyUp { code });
    }

    fn name(&self) -> &str {
        "memory"
    }
}
