//! MacroKit Recording Model
//!
//! Defines the core data contracts for recorded macros:
//! - **Events:** Timestamped input events (pointer, button, scroll, key)
//! - **Recording:** Ordered event list plus name, creation time and duration
//! - **Storage:** Persisting recordings as JSON documents
//!
//! Timestamps are monotonic nanoseconds relative to the start of the
//! recording session. Pointer coordinates are absolute screen pixels.

pub mod event;
pub mod recording;
pub mod storage;

pub use event::*;
pub use recording::*;
pub use storage::*;
