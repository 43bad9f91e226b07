//! MacroKit Common Utilities
//!
//! Shared infrastructure for all MacroKit crates:
//! - Error types and result aliases
//! - Session clock for stamping recorded events
//! - Tracing/logging initialization
//! - Persisted application settings

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
