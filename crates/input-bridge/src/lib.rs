//! MacroKit Input Bridge
//!
//! The session engine never talks to the operating system directly. It
//! drives two narrow contracts instead:
//!
//! - **[`Actuator`]:** synthesizes pointer and keyboard input
//! - **[`EventSource`]:** delivers captured input events to a recorder
//!
//! Platform backends implement these traits out of tree. This crate ships
//! in-process implementations used by the CLI and by tests:
//! [`TracingActuator`], [`MemoryActuator`] and [`ManualEventSource`].

pub mod actuator;
pub mod source;

pub use actuator::*;
pub use source::*;
