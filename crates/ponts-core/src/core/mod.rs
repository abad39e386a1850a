//! UI-agnostic chat runtime.
//!
//! - `session`: transcript controller (turns, submit, cancel)
//! - `events`: stream event types and channel
//! - `engine`: drives one request against the backend
//! - `interrupt`: Ctrl+C handling for non-TUI modes

pub mod engine;
pub mod events;
pub mod interrupt;
pub mod session;
