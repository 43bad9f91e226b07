//! Clock and timing utilities for session timestamps.
//!
//! Every recorded event is stamped relative to a monotonic epoch captured
//! when the recording session starts. This module provides:
//! - Capturing the epoch alongside the wall-clock start time
//! - Elapsed time since the epoch
//! - Conversions between nanosecond stamps and `Duration`

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Utc>,
}

impl RecordingClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Create a clock from a known epoch.
    pub fn from_epoch(epoch: Instant, wall: DateTime<Utc>) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Time elapsed since the session started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Nanoseconds elapsed since the session started.
    pub fn elapsed_ns(&self) -> u64 {
        duration_to_ns(self.epoch.elapsed())
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> DateTime<Utc> {
        self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

/// Convert a `Duration` to whole nanoseconds, saturating at `u64::MAX`.
pub fn duration_to_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Convert nanoseconds to a `Duration`.
pub fn ns_to_duration(ns: u64) -> Duration {
    Duration::from_nanos(ns)
}
