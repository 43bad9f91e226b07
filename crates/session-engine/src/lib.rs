//! MacroKit Session Engine
//!
//! Runs the three input automation sessions and keeps at most one of them
//! active at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                   Coordinator                     │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐   │
//! │  │AutoClicker │  │  Recorder  │  │   Player   │   │
//! │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘   │
//! │        │               │               │          │
//! │        ▼               ▲               ▼          │
//! │    Actuator       EventSource      Actuator       │
//! │                                                   │
//! │  StateEvent ──► Notifier (broadcast) ──► UI/CLI   │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Every start allocates a new activation: a generation number plus a
//! cancel channel. Background loops run on a tokio runtime handle captured
//! at construction and only act while their generation is current.

pub mod autoclicker;
pub mod config;
pub mod coordinator;
pub mod notify;
pub mod player;
pub mod recorder;
pub mod signal;

pub use autoclicker::*;
pub use config::*;
pub use coordinator::*;
pub use notify::*;
pub use player::*;
pub use recorder::*;
pub use signal::{Activation, CancelToken};
