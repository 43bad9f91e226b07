//! Input event types for recorded macros.
//!
//! Events are stamped with monotonic nanoseconds since the recording
//! session started. Pointer coordinates are absolute screen pixels so a
//! recording replays against the same desktop layout it was captured on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monotonic timestamp in nanoseconds since recording start.
pub type TimestampNs = u64;

/// A single recorded input event with timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Monotonic nanoseconds since recording start.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// The event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Discriminated union of event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Pointer moved to an absolute position.
    PointerMove { x: i32, y: i32 },

    /// Mouse button pressed or released.
    Button {
        button: MouseButton,
        state: ButtonState,
        /// Pointer position at press/release time.
        x: i32,
        y: i32,
    },

    /// Wheel scrolled. Positive delta scrolls up.
    Scroll {
        delta: i32,
        /// Pointer position at scroll time.
        x: i32,
        y: i32,
    },

    /// Keyboard key pressed or released.
    Key {
        /// Virtual key code.
        key_code: u16,
        /// Hardware scan code (informational, not used for replay).
        #[serde(default)]
        scan_code: u16,
        state: ButtonState,
    },
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Button/key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Down,
    Up,
}

/// Whether a synthesized click is a single or a double click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickType {
    #[default]
    Single,
    Double,
}

impl MouseButton {
    /// Lowercase name used in settings files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }

    /// Parse a button name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" | "center" => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

impl ClickType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickType::Single => "single",
            ClickType::Double => "double",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single" => Some(ClickType::Single),
            "double" => Some(ClickType::Double),
            _ => None,
        }
    }
}

impl EventKind {
    /// Create a pointer-move payload.
    pub fn pointer_move(x: i32, y: i32) -> Self {
        EventKind::PointerMove { x, y }
    }

    /// Create a button payload.
    pub fn button(button: MouseButton, state: ButtonState, x: i32, y: i32) -> Self {
        EventKind::Button {
            button,
            state,
            x,
            y,
        }
    }

    /// Create a scroll payload.
    pub fn scroll(delta: i32, x: i32, y: i32) -> Self {
        EventKind::Scroll { delta, x, y }
    }

    /// Create a key payload.
    pub fn key(key_code: u16, scan_code: u16, state: ButtonState) -> Self {
        EventKind::Key {
            key_code,
            scan_code,
            state,
        }
    }

    /// Whether this payload comes from the pointer device.
    pub fn is_mouse(&self) -> bool {
        !matches!(self, EventKind::Key { .. })
    }

    /// The virtual key code for keyboard payloads.
    pub fn key_code(&self) -> Option<u16> {
        match self {
            EventKind::Key { key_code, .. } => Some(*key_code),
            _ => None,
        }
    }
}

impl InputEvent {
    /// Wrap a payload with its timestamp.
    pub fn new(timestamp_ns: TimestampNs, kind: EventKind) -> Self {
        Self { timestamp_ns, kind }
    }

    /// Create a pointer-move event.
    pub fn pointer_move(timestamp_ns: TimestampNs, x: i32, y: i32) -> Self {
        Self::new(timestamp_ns, EventKind::pointer_move(x, y))
    }

    /// Create a button event.
    pub fn button(
        timestamp_ns: TimestampNs,
        button: MouseButton,
        state: ButtonState,
        x: i32,
        y: i32,
    ) -> Self {
        Self::new(timestamp_ns, EventKind::button(button, state, x, y))
    }

    /// Create a scroll event.
    pub fn scroll(timestamp_ns: TimestampNs, delta: i32, x: i32, y: i32) -> Self {
        Self::new(timestamp_ns, EventKind::scroll(delta, x, y))
    }

    /// Create a key event.
    pub fn key(timestamp_ns: TimestampNs, key_code: u16, state: ButtonState) -> Self {
        Self::new(timestamp_ns, EventKind::key(key_code, 0, state))
    }

    /// Timestamp as a `Duration` since recording start.
    pub fn timestamp(&self) -> Duration {
        Duration::from_nanos(self.timestamp_ns)
    }

    /// Extract pointer position if this event contains one.
    pub fn pointer_position(&self) -> Option<(i32, i32)> {
        match &self.kind {
            EventKind::PointerMove { x, y } => Some((*x, *y)),
            EventKind::Button { x, y, .. } => Some((*x, *y)),
            EventKind::Scroll { x, y, .. } => Some((*x, *y)),
            EventKind::Key { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_event_roundtrip() {
        let event = InputEvent::button(
            2_000_000_000,
            MouseButton::Right,
            ButtonState::Down,
            120,
            -40,
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_json_format() {
        let event = InputEvent::pointer_move(1_234_567, 640, 480);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"t\":1234567"));
        assert!(json.contains("\"type\":\"pointer_move\""));
        assert!(json.contains("\"x\":640"));
        assert!(json.contains("\"y\":480"));
    }

    #[test]
    fn test_key_event_without_scan_code_parses() {
        let raw = r#"{"t":5,"type":"key","key_code":65,"state":"down"}"#;
        let parsed: InputEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.kind, EventKind::key(65, 0, ButtonState::Down));
    }

    #[test]
    fn test_pointer_position_extraction() {
        let scroll = InputEvent::scroll(0, 120, 3, 4);
        assert_eq!(scroll.pointer_position(), Some((3, 4)));

        let key = InputEvent::key(0, 0x41, ButtonState::Down);
        assert_eq!(key.pointer_position(), None);
        assert!(!key.kind.is_mouse());
        assert_eq!(key.kind.key_code(), Some(0x41));
    }

    #[test]
    fn test_button_and_click_type_names() {
        assert_eq!(MouseButton::parse("Left"), Some(MouseButton::Left));
        assert_eq!(MouseButton::parse("center"), Some(MouseButton::Middle));
        assert_eq!(MouseButton::parse("side"), None);
        assert_eq!(ClickType::parse("DOUBLE"), Some(ClickType::Double));
        assert_eq!(ClickType::Single.as_str(), "single");
    }

    #[test]
    fn test_timestamp_duration() {
        let event = InputEvent::pointer_move(1_500_000_000, 0, 0);
        assert_eq!(event.timestamp(), Duration::from_millis(1500));
    }
}
