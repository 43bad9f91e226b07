//! Recording document: the ordered event list plus its metadata.
//!
//! A recording is only mutated by the recorder session that owns it. Once
//! it is handed to a player it is shared read-only.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{InputEvent, TimestampNs};

/// Current recording schema version.
pub const RECORDING_VERSION: &str = "1.0";

/// A recorded macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Schema version.
    pub version: String,

    /// Human-readable name.
    pub name: String,

    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the recording session started.
    pub created_at: DateTime<Utc>,

    /// Total length of the recording in nanoseconds.
    pub duration_ns: TimestampNs,

    /// Events in non-decreasing timestamp order.
    pub events: Vec<InputEvent>,

    /// Derived metadata, computed by [`Recording::finalize`].
    #[serde(default)]
    pub metadata: RecordingMetadata,
}

/// Descriptive metadata stored alongside the events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Number of events at finalization time.
    #[serde(default)]
    pub event_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,

    /// Version of the application that produced the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl Recording {
    /// Create an empty recording stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_created_at(name, Utc::now())
    }

    /// Create an empty recording with an explicit creation time.
    pub fn with_created_at(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            version: RECORDING_VERSION.to_string(),
            name: name.into(),
            description: None,
            created_at,
            duration_ns: 0,
            events: Vec::new(),
            metadata: RecordingMetadata::default(),
        }
    }

    /// Append an event, extending the duration to cover it.
    ///
    /// Callers append in timestamp order; the recorder guarantees this by
    /// stamping under its session lock.
    pub fn add_event(&mut self, event: InputEvent) {
        if event.timestamp_ns > self.duration_ns {
            self.duration_ns = event.timestamp_ns;
        }
        self.events.push(event);
    }

    /// Recompute derived metadata before handing the recording out.
    pub fn finalize(&mut self) {
        self.metadata.event_count = self.events.len();
        if self.metadata.app_version.is_none() {
            self.metadata.app_version = Some(env!("CARGO_PKG_VERSION").to_string());
        }
    }

    /// Total length as a `Duration`.
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_ns)
    }

    /// Timestamp of the last event, if any.
    pub fn last_timestamp_ns(&self) -> Option<TimestampNs> {
        self.events.last().map(|e| e.timestamp_ns)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Check the ordering and duration invariants.
    ///
    /// Returns a human-readable description of every violation found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        if self.version != RECORDING_VERSION {
            errors.push(format!("Unsupported recording version: {}", self.version));
        }

        for (i, pair) in self.events.windows(2).enumerate() {
            if pair[1].timestamp_ns < pair[0].timestamp_ns {
                errors.push(format!(
                    "Event {} at {}ns precedes event {} at {}ns",
                    i + 1,
                    pair[1].timestamp_ns,
                    i,
                    pair[0].timestamp_ns
                ));
            }
        }

        if let Some(max) = self.events.iter().map(|e| e.timestamp_ns).max() {
            if self.duration_ns < max {
                errors.push(format!(
                    "Duration {}ns is shorter than last event at {}ns",
                    self.duration_ns, max
                ));
            }
        }

        errors
    }
}
