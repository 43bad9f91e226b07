//! Validated session configuration.
//!
//! Persisted settings in [`macrokit_common::config`] are loose strings and
//! numbers. The types here are what sessions actually run with: every value
//! has been checked, and invalid input is rejected rather than clamped.

use std::time::Duration;

use macrokit_common::config::{ClickerSettings, PlaybackSettings};
use macrokit_common::error::{MacroError, MacroResult};
use macrokit_recording_model::event::{ClickType, MouseButton, TimestampNs};
use rand::Rng;

/// Shortest delay between two clicks.
pub const MIN_CLICK_DELAY: Duration = Duration::from_millis(1);

/// Default key codes the recorder drops: the record, playback and stop hotkeys.
pub const DEFAULT_FILTERED_KEYS: [u16; 3] = [0x78, 0x79, 0x7A];

/// When the auto-clicker stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    UntilStopped,
    Count(u32),
}

/// Where the auto-clicker clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickPosition {
    /// Wherever the pointer currently is.
    #[default]
    Current,
    /// Move to this screen coordinate before every click.
    Fixed { x: i32, y: i32 },
}

/// Auto-clicker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoClickerConfig {
    /// Nominal time between clicks.
    pub interval: Duration,
    /// Symmetric bound of the random offset added to each interval.
    pub jitter: Duration,
    pub button: MouseButton,
    pub click_type: ClickType,
    pub repeat: RepeatMode,
    pub position: ClickPosition,
}

impl Default for AutoClickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            jitter: Duration::ZERO,
            button: MouseButton::Left,
            click_type: ClickType::Single,
            repeat: RepeatMode::UntilStopped,
            position: ClickPosition::Current,
        }
    }
}

impl AutoClickerConfig {
    pub fn validate(&self) -> MacroResult<()> {
        if self.interval < MIN_CLICK_DELAY {
            return Err(MacroError::validation(
                "click interval must be at least 1 millisecond",
            ));
        }
        if self.repeat == RepeatMode::Count(0) {
            return Err(MacroError::validation("repeat count must be at least 1"));
        }
        Ok(())
    }
}

impl TryFrom<&ClickerSettings> for AutoClickerConfig {
    type Error = MacroError;

    fn try_from(settings: &ClickerSettings) -> MacroResult<Self> {
        if settings.jitter_ms < 0 {
            return Err(MacroError::validation("jitter must not be negative"));
        }
        let button = MouseButton::parse(&settings.button).ok_or_else(|| {
            MacroError::validation(format!("unknown mouse button: {}", settings.button))
        })?;
        let click_type = ClickType::parse(&settings.click_type).ok_or_else(|| {
            MacroError::validation(format!("unknown click type: {}", settings.click_type))
        })?;
        let repeat = match settings.repeat_mode.trim().to_ascii_lowercase().as_str() {
            "until_stopped" | "infinite" => RepeatMode::UntilStopped,
            "count" => RepeatMode::Count(settings.repeat_count),
            other => {
                return Err(MacroError::validation(format!(
                    "unknown repeat mode: {other}"
                )))
            }
        };
        let position = match settings.fixed_position {
            Some([x, y]) => ClickPosition::Fixed { x, y },
            None => ClickPosition::Current,
        };

        let config = Self {
            interval: Duration::from_millis(settings.interval_ms),
            jitter: Duration::from_millis(settings.jitter_ms.unsigned_abs()),
            button,
            click_type,
            repeat,
            position,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Delay before the next click: interval plus a uniform offset in
/// `[-jitter, +jitter]`, floored at [`MIN_CLICK_DELAY`].
pub fn jittered_delay<R: Rng + ?Sized>(config: &AutoClickerConfig, rng: &mut R) -> Duration {
    let interval = config.interval.as_nanos() as i128;
    let jitter = config.jitter.as_nanos() as i128;
    let offset = if jitter == 0 {
        0
    } else {
        rng.gen_range(-jitter..=jitter)
    };
    let floor = MIN_CLICK_DELAY.as_nanos() as i128;
    let nanos = (interval + offset).max(floor).min(u64::MAX as i128);
    Duration::from_nanos(nanos as u64)
}

/// How many passes the player makes over a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Once,
    Count(u32),
    Continuous,
}

impl LoopMode {
    /// Whether pass number `loop_index` (1-based) should run.
    pub fn should_play(&self, loop_index: u32) -> bool {
        match self {
            LoopMode::Once => loop_index == 1,
            LoopMode::Count(n) => loop_index <= *n,
            LoopMode::Continuous => true,
        }
    }
}

/// Playback configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Speed multiplier; 2.0 halves every delay.
    pub speed: f64,
    pub loop_mode: LoopMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_mode: LoopMode::Once,
        }
    }
}

impl PlaybackConfig {
    /// Replace an unusable speed with 1.0.
    pub fn normalized(mut self) -> Self {
        if !is_valid_speed(self.speed) {
            self.speed = 1.0;
        }
        self
    }

    pub fn validate(&self) -> MacroResult<()> {
        if self.loop_mode == LoopMode::Count(0) {
            return Err(MacroError::validation("loop count must be at least 1"));
        }
        Ok(())
    }
}

impl TryFrom<&PlaybackSettings> for PlaybackConfig {
    type Error = MacroError;

    fn try_from(settings: &PlaybackSettings) -> MacroResult<Self> {
        let speed = parse_speed(&settings.speed)?;
        let loop_mode = match settings.loop_mode.trim().to_ascii_lowercase().as_str() {
            "once" => LoopMode::Once,
            "count" => LoopMode::Count(settings.loop_count),
            "continuous" | "infinite" => LoopMode::Continuous,
            other => {
                return Err(MacroError::validation(format!("unknown loop mode: {other}")))
            }
        };
        let config = Self { speed, loop_mode };
        config.validate()?;
        Ok(config)
    }
}

pub fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

/// Parse a speed label such as `"2x"`, `"0.5x"` or `"1.5"`.
pub fn parse_speed(label: &str) -> MacroResult<f64> {
    let trimmed = label.trim();
    let number = trimmed
        .strip_suffix('x')
        .or_else(|| trimmed.strip_suffix('X'))
        .unwrap_or(trimmed);
    let speed: f64 = number
        .trim()
        .parse()
        .map_err(|_| MacroError::validation(format!("invalid playback speed: {label}")))?;
    if !is_valid_speed(speed) {
        return Err(MacroError::validation(format!(
            "playback speed must be positive: {label}"
        )));
    }
    Ok(speed)
}

/// Real-time wait between two recorded events at the given speed.
pub fn scaled_delay(previous_ns: TimestampNs, current_ns: TimestampNs, speed: f64) -> Duration {
    let gap = current_ns.saturating_sub(previous_ns);
    if gap == 0 {
        return Duration::ZERO;
    }
    let speed = if is_valid_speed(speed) { speed } else { 1.0 };
    Duration::try_from_secs_f64(gap as f64 / 1e9 / speed).unwrap_or(Duration::MAX)
}

/// What the recorder keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Name given to new recordings.
    pub name: String,
    pub record_mouse: bool,
    pub record_keyboard: bool,
    /// Key codes never recorded, typically the hotkeys that drive the recorder.
    pub filtered_keys: Vec<u16>,
    /// End the recording at its last event instead of at the stop call.
    pub trim_trailing_idle: bool,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            name: "Untitled Recording".to_string(),
            record_mouse: true,
            record_keyboard: true,
            filtered_keys: DEFAULT_FILTERED_KEYS.to_vec(),
            trim_trailing_idle: false,
        }
    }
}
